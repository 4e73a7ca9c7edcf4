use group_directory::{DirectoryGroupEntry, GroupDrift, normalize_members};
use proptest::prelude::*;

fn observed(description: &str, members: Vec<String>) -> DirectoryGroupEntry {
    DirectoryGroupEntry {
        distinguished_name: "cn=team-x,ou=groups,dc=example,dc=org".to_string(),
        description: Some(description.to_string()),
        members,
        object_classes: vec!["groupOfUniqueNames".to_string()],
    }
}

proptest! {
    #[test]
    fn case_and_order_never_cause_drift(
        members in prop::collection::vec("[a-zA-Z]{1,8}", 0..8),
        seed in any::<u64>(),
    ) {
        // Shuffle deterministically and flip case on every other member
        let mut shuffled: Vec<String> = members
            .iter()
            .enumerate()
            .map(|(i, m)| if i % 2 == 0 { m.to_uppercase() } else { m.to_lowercase() })
            .collect();
        let len = shuffled.len();
        if len > 1 {
            shuffled.rotate_left((seed as usize) % len);
        }

        let drift = GroupDrift::compute(Some(&observed("Team", shuffled)), "Team", &members);
        prop_assert!(drift.is_in_sync(), "unexpected drift: {:?}", drift.describe());
    }

    #[test]
    fn normalization_is_sorted_unique_lowercase(
        members in prop::collection::vec("[a-zA-Z=,]{0,8}", 0..12),
    ) {
        let normalized = normalize_members(&members);

        prop_assert!(normalized.windows(2).all(|w| w[0] < w[1]));
        prop_assert!(normalized.iter().all(|m| *m == m.to_lowercase()));
        prop_assert_eq!(normalize_members(&normalized), normalized.clone());
        for member in &members {
            prop_assert!(normalized.contains(&member.to_lowercase()));
        }
    }

    #[test]
    fn changed_description_always_drifts(description in "\\PC{0,16}", suffix in "[a-z]{1,4}") {
        let desired = format!("{}{}", description, suffix);
        let drift = GroupDrift::compute(Some(&observed(&description, Vec::new())), &desired, &[]);
        prop_assert!(!drift.is_in_sync());
        prop_assert!(drift.description.is_some());
    }
}

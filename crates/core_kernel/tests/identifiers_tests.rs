//! Unit tests for the identifiers module
//!
//! Tests cover identifier creation, parsing, conversion, ordering
//! and display formatting.

use core_kernel::{AccountId, AccountSystemId, InvoiceId, SubjectId, TransactionId};
use std::collections::BTreeSet;
use uuid::Uuid;

mod account_id_tests {
    use super::*;

    #[test]
    fn test_new_generates_unique_ids() {
        let id1 = AccountId::new();
        let id2 = AccountId::new();
        assert_ne!(id1, id2);
    }

    #[test]
    fn test_new_v7_generates_time_ordered_ids() {
        let id1 = AccountId::new_v7();
        std::thread::sleep(std::time::Duration::from_millis(1));
        let id2 = AccountId::new_v7();
        assert!(id1 < id2);
    }

    #[test]
    fn test_from_uuid() {
        let uuid = Uuid::new_v4();
        let id = AccountId::from_uuid(uuid);
        assert_eq!(*id.as_uuid(), uuid);
    }

    #[test]
    fn test_prefix() {
        assert_eq!(AccountId::prefix(), "ACC");
        assert_eq!(AccountId::PREFIX, AccountId::prefix());
    }

    #[test]
    fn test_from_str_with_prefix() {
        let original = AccountId::new();
        let parsed: AccountId = original.to_string().parse().unwrap();
        assert_eq!(original, parsed);
    }

    #[test]
    fn test_from_str_without_prefix() {
        let uuid = Uuid::new_v4();
        let parsed: AccountId = uuid.to_string().parse().unwrap();
        assert_eq!(*parsed.as_uuid(), uuid);
    }

    #[test]
    fn test_from_str_rejects_garbage() {
        let err = "ACC-not-a-uuid".parse::<AccountId>().unwrap_err();
        assert_eq!(err.kind, "ACC");
        assert_eq!(err.input, "ACC-not-a-uuid");
    }

    #[test]
    fn test_from_str_rejects_other_kinds() {
        let invoice = InvoiceId::new();
        assert!(invoice.to_string().parse::<AccountId>().is_err());
        // the bare UUID is accepted by every kind
        let bare: AccountId = invoice.as_uuid().to_string().parse().unwrap();
        assert_eq!(bare.as_uuid(), invoice.as_uuid());
    }

    #[test]
    fn test_from_str_trims_whitespace() {
        let id = AccountId::new();
        let parsed: AccountId = format!("  {id} ").parse().unwrap();
        assert_eq!(parsed, id);
    }

    #[test]
    fn test_ordering_is_usable_for_lock_ordering() {
        let ids: BTreeSet<AccountId> = (0..16).map(|_| AccountId::new()).collect();
        let sorted: Vec<_> = ids.iter().copied().collect();
        let mut resorted = sorted.clone();
        resorted.sort();
        assert_eq!(sorted, resorted);
    }
}

mod prefix_tests {
    use super::*;

    #[test]
    fn test_all_prefixes_are_distinct() {
        let prefixes = [
            SubjectId::prefix(),
            AccountSystemId::prefix(),
            AccountId::prefix(),
            TransactionId::prefix(),
            InvoiceId::prefix(),
        ];
        let unique: BTreeSet<_> = prefixes.iter().collect();
        assert_eq!(unique.len(), prefixes.len());
    }

    #[test]
    fn test_display_uses_prefix() {
        assert!(SubjectId::new().to_string().starts_with("SUBJ-"));
        assert!(AccountSystemId::new().to_string().starts_with("SYS-"));
        assert!(TransactionId::new().to_string().starts_with("TXN-"));
        assert!(InvoiceId::new().to_string().starts_with("INV-"));
    }

    #[test]
    fn test_serde_is_transparent() {
        let id = SubjectId::new();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{}\"", id.as_uuid()));
        let back: SubjectId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }
}

//! Item Id Generation
//!
//! Ids are content fingerprints: a salted blake3 digest over the owner,
//! title and creation timestamp. The salt keeps repeated submissions of
//! identical content from colliding, while the digest still ties the id
//! back to what created it. Format: `{tag}_{19 hex digest}_{4 hex salt}`,
//! 26 characters total.

use rand::Rng;

use super::entity::{DomainError, DomainResult};
use super::item::ItemType;

const FINGERPRINT_LEN: usize = 19;

/// Derive a fresh id for an item. Two calls with identical arguments
/// produce different ids (random salt).
pub fn generate_id(
    owner_id: &str,
    title: &str,
    timestamp: &str,
    item_type: ItemType,
) -> DomainResult<String> {
    let owner_id = owner_id.trim();
    let title = title.trim();
    let timestamp = timestamp.trim();
    if owner_id.is_empty() || title.is_empty() || timestamp.is_empty() {
        return Err(DomainError::Validation(
            "owner_id, title and timestamp are required for id generation".to_string(),
        ));
    }
    let tag = item_type.id_tag().ok_or_else(|| {
        DomainError::Validation(format!(
            "ids are only generated for tasks and goals, not {}",
            item_type.as_str()
        ))
    })?;

    let salt: u16 = rand::thread_rng().gen();
    let salt = format!("{:04x}", salt);
    // "::" never appears in trimmed inputs we accept, so fields cannot
    // bleed into each other inside the digest input.
    let input = format!("{}::{}::{}::{}", owner_id, title, timestamp, salt);
    let digest = blake3::hash(input.as_bytes()).to_hex().to_string();
    let fingerprint = &digest[..FINGERPRINT_LEN];

    Ok(format!("{}_{}_{}", tag, fingerprint, salt))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_format_is_fixed_width() {
        let id = generate_id("user-1", "Water plants", "2026-01-05T10:00:00Z", ItemType::Task)
            .unwrap();
        // t_{19}_{4}
        assert_eq!(id.len(), 26);
        assert!(id.starts_with("t_"));
        let parts: Vec<&str> = id.split('_').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[1].len(), 19);
        assert_eq!(parts[2].len(), 4);
        assert!(parts[1].chars().all(|c| c.is_ascii_hexdigit()));
        assert!(parts[2].chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_goal_prefix() {
        let id = generate_id("user-1", "Run a marathon", "2026-01-05T10:00:00Z", ItemType::Goal)
            .unwrap();
        assert!(id.starts_with("g_"));
    }

    #[test]
    fn test_identical_inputs_produce_different_ids() {
        let a = generate_id("user-1", "Same", "2026-01-05T10:00:00Z", ItemType::Task).unwrap();
        let b = generate_id("user-1", "Same", "2026-01-05T10:00:00Z", ItemType::Task).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_blank_inputs_are_rejected() {
        for (owner, title, ts) in [
            ("", "Title", "2026-01-05T10:00:00Z"),
            ("user-1", "   ", "2026-01-05T10:00:00Z"),
            ("user-1", "Title", ""),
        ] {
            let err = generate_id(owner, title, ts, ItemType::Task).unwrap_err();
            assert_eq!(err.code(), "validation_error");
        }
    }

    #[test]
    fn test_category_has_no_id_tag() {
        let err =
            generate_id("user-1", "Chores", "2026-01-05T10:00:00Z", ItemType::Category).unwrap_err();
        assert_eq!(err.code(), "validation_error");
    }
}

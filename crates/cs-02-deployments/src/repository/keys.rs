//! Key layout. Components are `\0`-separated; ids are zero-padded to 20
//! digits so lexicographic key order equals numeric order.

use crate::domain::entities::{DeploymentId, EntityType, Timestamp};

pub const DEPLOYMENT_PREFIX: &[u8] = b"dep\x00";
pub const ENTITY_PREFIX: &[u8] = b"ent\x00";
pub const POINTER_INDEX_PREFIX: &[u8] = b"pidx\x00";
pub const LAST_DEPLOYED_PREFIX: &[u8] = b"last\x00";
pub const CONTENT_FILE_PREFIX: &[u8] = b"cf\x00";
pub const POINTER_CHANGES_PREFIX: &[u8] = b"pchg\x00";

const SEP: u8 = 0;

fn padded(n: u64) -> String {
    format!("{:020}", n)
}

fn join(prefix: &[u8], parts: &[&str]) -> Vec<u8> {
    let mut key = prefix.to_vec();
    for (i, part) in parts.iter().enumerate() {
        if i > 0 {
            key.push(SEP);
        }
        key.extend_from_slice(part.as_bytes());
    }
    key
}

pub fn deployment(id: DeploymentId) -> Vec<u8> {
    join(DEPLOYMENT_PREFIX, &[&padded(id)])
}

pub fn entity(entity_id: &str) -> Vec<u8> {
    join(ENTITY_PREFIX, &[entity_id])
}

/// Prefix of every index row for one (type, pointer); the trailing
/// separator keeps `p1` from matching `p10`.
pub fn pointer_index_prefix(entity_type: EntityType, pointer: &str) -> Vec<u8> {
    let mut key = join(POINTER_INDEX_PREFIX, &[entity_type.as_str(), pointer]);
    key.push(SEP);
    key
}

pub fn pointer_index(entity_type: EntityType, pointer: &str, id: DeploymentId) -> Vec<u8> {
    let mut key = pointer_index_prefix(entity_type, pointer);
    key.extend_from_slice(padded(id).as_bytes());
    key
}

pub fn last_deployed(entity_type: EntityType, pointer: &str) -> Vec<u8> {
    join(LAST_DEPLOYED_PREFIX, &[entity_type.as_str(), pointer])
}

pub fn content_file_prefix(hash: &str) -> Vec<u8> {
    let mut key = join(CONTENT_FILE_PREFIX, &[hash]);
    key.push(SEP);
    key
}

pub fn content_file(hash: &str, id: DeploymentId) -> Vec<u8> {
    let mut key = content_file_prefix(hash);
    key.extend_from_slice(padded(id).as_bytes());
    key
}

pub fn pointer_changes(local_timestamp: Timestamp, id: DeploymentId) -> Vec<u8> {
    join(POINTER_CHANGES_PREFIX, &[&padded(local_timestamp), &padded(id)])
}

/// `[start, end)` bounds of the `pchg` rows recorded between `from` and
/// `to`, both inclusive.
pub fn pointer_changes_range(
    from: Option<Timestamp>,
    to: Option<Timestamp>,
) -> (Vec<u8>, Vec<u8>) {
    let start = pointer_changes(from.unwrap_or(0), 0);
    let end = match to.and_then(|t| t.checked_add(1)) {
        Some(next) => pointer_changes(next, 0),
        None => prefix_end(POINTER_CHANGES_PREFIX),
    };
    (start, end)
}

/// Smallest key sorting after every key that starts with `prefix`.
fn prefix_end(prefix: &[u8]) -> Vec<u8> {
    let mut end = prefix.to_vec();
    while let Some(last) = end.pop() {
        if last < u8::MAX {
            end.push(last + 1);
            break;
        }
    }
    end
}

/// Deployment id in the last component of a key.
pub fn trailing_id(key: &[u8]) -> Option<DeploymentId> {
    let start = key.iter().rposition(|b| *b == SEP)? + 1;
    std::str::from_utf8(&key[start..]).ok()?.parse().ok()
}

/// Content hash of a `cf` row key.
pub fn content_hash(key: &[u8]) -> Option<&str> {
    let rest = key.strip_prefix(CONTENT_FILE_PREFIX)?;
    let end = rest.iter().rposition(|b| *b == SEP)?;
    std::str::from_utf8(&rest[..end]).ok()
}

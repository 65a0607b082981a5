//! Process-wide numeric-id to name cache for uids and gids (`spec.md` §4.6).
//! Many concurrent readers, an exclusive writer on first insertion for a
//! given id; never evicts. Delegates the actual lookup to the OS via
//! `uzers` on unix; falls back to the decimal string on lookup failure or on
//! non-unix targets.

use std::collections::HashMap;
use std::sync::RwLock;

#[derive(Debug, Default)]
pub struct NameCache {
    users: RwLock<HashMap<u32, String>>,
    groups: RwLock<HashMap<u32, String>>,
}

impl NameCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn user_name(&self, uid: u32) -> String {
        if let Some(name) = self.users.read().unwrap().get(&uid) {
            return name.clone();
        }
        let name = lookup_user(uid).unwrap_or_else(|| uid.to_string());
        self.users
            .write()
            .unwrap()
            .entry(uid)
            .or_insert(name)
            .clone()
    }

    pub fn group_name(&self, gid: u32) -> String {
        if let Some(name) = self.groups.read().unwrap().get(&gid) {
            return name.clone();
        }
        let name = lookup_group(gid).unwrap_or_else(|| gid.to_string());
        self.groups
            .write()
            .unwrap()
            .entry(gid)
            .or_insert(name)
            .clone()
    }
}

#[cfg(unix)]
fn lookup_user(uid: u32) -> Option<String> {
    uzers::get_user_by_uid(uid).map(|u| u.name().to_string_lossy().into_owned())
}

#[cfg(unix)]
fn lookup_group(gid: u32) -> Option<String> {
    uzers::get_group_by_gid(gid).map(|g| g.name().to_string_lossy().into_owned())
}

#[cfg(not(unix))]
fn lookup_user(_uid: u32) -> Option<String> {
    None
}

#[cfg(not(unix))]
fn lookup_group(_gid: u32) -> Option<String> {
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_id_falls_back_to_decimal_string() {
        let cache = NameCache::new();
        // An id unlikely to exist on any test host.
        assert_eq!(cache.user_name(4_000_000_000), "4000000000");
        assert_eq!(cache.group_name(4_000_000_001), "4000000001");
    }

    #[test]
    fn repeated_lookup_is_cached() {
        let cache = NameCache::new();
        let first = cache.user_name(4_000_000_002);
        let second = cache.user_name(4_000_000_002);
        assert_eq!(first, second);
    }
}

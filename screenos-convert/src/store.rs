//! Repository of emitted objects.
//!
//! Objects are unique by exact name; adding a name that is already present
//! keeps the first object. Target predefined names live in the store as
//! handles only and are never emitted.

use std::collections::{BTreeSet, HashMap};

use screenos_core::netutil;

use crate::model::{NormalizedObject, ObjectKind};

#[derive(Debug, Clone, Default)]
pub struct ObjectStore {
    objects: Vec<NormalizedObject>,
    index: HashMap<String, usize>,
    predefined: BTreeSet<String>,
}

impl ObjectStore {
    pub fn add_predefined(&mut self, name: &str) {
        self.predefined.insert(name.to_string());
    }

    /// Add `object` unless its name is empty or already taken.
    ///
    /// Returns true when the object was stored.
    pub fn add(&mut self, object: NormalizedObject) -> bool {
        if object.name.is_empty()
            || self.index.contains_key(&object.name)
            || self.predefined.contains(&object.name)
        {
            return false;
        }
        self.index.insert(object.name.clone(), self.objects.len());
        self.objects.push(object);
        true
    }

    /// True for emitted objects and predefined handles alike.
    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name) || self.predefined.contains(name)
    }

    pub fn is_predefined(&self, name: &str) -> bool {
        self.predefined.contains(name)
    }

    pub fn get(&self, name: &str) -> Option<&NormalizedObject> {
        self.index.get(name).map(|&idx| &self.objects[idx])
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut NormalizedObject> {
        match self.index.get(name) {
            Some(&idx) => self.objects.get_mut(idx),
            None => None,
        }
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &NormalizedObject> {
        self.objects.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut NormalizedObject> {
        self.objects.iter_mut()
    }

    pub fn into_objects(self) -> Vec<NormalizedObject> {
        self.objects
    }

    pub fn find_host(&self, ip: &str) -> Option<&NormalizedObject> {
        self.objects
            .iter()
            .find(|o| matches!(&o.kind, ObjectKind::Host { ip: host } if host == ip))
    }

    pub fn find_network(&self, subnet: &str, netmask: &str) -> Option<&NormalizedObject> {
        self.objects.iter().find(|o| {
            matches!(&o.kind, ObjectKind::Network { subnet: s, netmask: m }
                if s == subnet && m == netmask)
        })
    }

    /// Host for a /32 mask, network otherwise.
    pub fn find_address(&self, ip: &str, netmask: &str) -> Option<&NormalizedObject> {
        if netutil::mask_length(netmask) == 32 {
            self.find_host(ip)
        } else {
            self.find_network(&netutil::network_of(ip, netmask), netmask)
        }
    }

    pub fn find_range(&self, first: &str, last: &str) -> Option<&NormalizedObject> {
        self.objects.iter().find(|o| {
            matches!(&o.kind, ObjectKind::Range { first: f, last: l } if f == first && l == last)
        })
    }

    /// Custom tcp, udp or other service matching a `<PROTO>_<value>` key.
    pub fn find_service_by_key(&self, key: &str) -> Option<&NormalizedObject> {
        let (proto, value) = key.split_once('_')?;
        self.objects.iter().find(|o| match (&o.kind, proto) {
            (ObjectKind::TcpService { port, .. }, "TCP") => port == value,
            (ObjectKind::UdpService { port, .. }, "UDP") => port == value,
            (ObjectKind::OtherService { protocol, .. }, "OTHER") => protocol == value,
            _ => false,
        })
    }

    /// Network group whose members equal `members`, ignoring order.
    pub fn find_network_group(&self, members: &[String]) -> Option<&NormalizedObject> {
        let wanted: BTreeSet<&String> = members.iter().collect();
        self.objects.iter().find(|o| {
            matches!(&o.kind, ObjectKind::NetworkGroup { members: m }
                if m.len() == members.len() && m.iter().collect::<BTreeSet<_>>() == wanted)
        })
    }

    /// Service group whose members equal `members`, ignoring order.
    pub fn find_service_group(&self, members: &[String]) -> Option<&NormalizedObject> {
        let wanted: BTreeSet<&String> = members.iter().collect();
        self.objects.iter().find(|o| {
            matches!(&o.kind, ObjectKind::ServiceGroup { members: m }
                if m.len() == members.len() && m.iter().collect::<BTreeSet<_>>() == wanted)
        })
    }

    /// Rename one object and every group member referring to it.
    ///
    /// With `zone` set only groups tagged with that zone are patched.
    pub fn rename(&mut self, old: &str, new: &str, zone: Option<&str>) -> bool {
        let Some(idx) = self.index.remove(old) else {
            return false;
        };
        if self.index.contains_key(new) {
            self.index.insert(old.to_string(), idx);
            return false;
        }
        self.objects[idx].name = new.to_string();
        self.index.insert(new.to_string(), idx);
        self.replace_member(old, new, zone);
        true
    }

    /// Drop one object. Group members referring to it are left alone.
    pub fn remove(&mut self, name: &str) -> Option<NormalizedObject> {
        let idx = self.index.remove(name)?;
        let removed = self.objects.remove(idx);
        for slot in self.index.values_mut() {
            if *slot > idx {
                *slot -= 1;
            }
        }
        Some(removed)
    }

    /// Replace member `old` with `new` in groups, optionally only those
    /// tagged with `zone`.
    pub fn replace_member(&mut self, old: &str, new: &str, zone: Option<&str>) {
        for object in &mut self.objects {
            if zone.is_some() && object.zone.as_deref() != zone {
                continue;
            }
            if let Some(members) = object.kind.members_mut() {
                for member in members.iter_mut().filter(|m| m.as_str() == old) {
                    *member = new.to_string();
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn host(name: &str, ip: &str) -> NormalizedObject {
        NormalizedObject::new(name, ObjectKind::Host { ip: ip.to_string() })
    }

    #[test]
    fn first_object_wins() {
        let mut store = ObjectStore::default();
        assert!(store.add(host("a", "1.1.1.1")));
        assert!(!store.add(host("a", "2.2.2.2")));
        assert!(!store.add(host("", "2.2.2.2")));
        store.add_predefined("any");
        assert!(!store.add(host("any", "3.3.3.3")));
        assert_eq!(store.len(), 1);
        assert!(store.contains("any"));
        assert!(store.get("any").is_none());
        assert_eq!(store.find_host("1.1.1.1").map(|o| o.name.as_str()), Some("a"));
    }

    #[test]
    fn lookups_by_value() {
        let mut store = ObjectStore::default();
        store.add(NormalizedObject::new(
            "n",
            ObjectKind::Network {
                subnet: "10.0.0.0".into(),
                netmask: "255.255.255.0".into(),
            },
        ));
        store.add(NormalizedObject::new(
            "t",
            ObjectKind::TcpService {
                port: "8443".into(),
                timeout: 0,
            },
        ));
        store.add(NormalizedObject::new(
            "g",
            ObjectKind::NetworkGroup {
                members: vec!["a".into(), "b".into()],
            },
        ));
        assert!(store.find_address("10.0.0.7", "255.255.255.0").is_some());
        assert!(store.find_service_by_key("TCP_8443").is_some());
        assert!(store.find_service_by_key("UDP_8443").is_none());
        assert!(store
            .find_network_group(&["b".to_string(), "a".to_string()])
            .is_some());
        assert!(store.find_network_group(&["a".to_string()]).is_none());
    }

    #[test]
    fn rename_patches_zone_groups() {
        let mut store = ObjectStore::default();
        store.add(host("srv", "1.1.1.1").with_zone("Trust"));
        store.add(
            NormalizedObject::new("g1", ObjectKind::NetworkGroup { members: vec!["srv".into()] })
                .with_zone("Trust"),
        );
        store.add(
            NormalizedObject::new("g2", ObjectKind::NetworkGroup { members: vec!["srv".into()] })
                .with_zone("DMZ"),
        );
        assert!(store.rename("srv", "srv_Trust", Some("Trust")));
        assert!(store.get("srv").is_none());
        assert_eq!(store.get("g1").expect("g1").members(), ["srv_Trust"]);
        assert_eq!(store.get("g2").expect("g2").members(), ["srv"]);
    }

    #[test]
    fn remove_keeps_index_consistent() {
        let mut store = ObjectStore::default();
        store.add(host("a", "1.1.1.1"));
        store.add(host("b", "2.2.2.2"));
        store.add(host("c", "3.3.3.3"));
        assert_eq!(store.remove("a").map(|o| o.name), Some("a".to_string()));
        assert!(store.remove("a").is_none());
        assert_eq!(store.get("c").map(|o| o.name.as_str()), Some("c"));
        assert_eq!(store.len(), 2);
    }
}

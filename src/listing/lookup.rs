use std::{borrow::Cow, collections::HashMap};

use crate::domain::{DocumentId, Group, Member, Subscriber};

/// Number of trailing id characters shown for unknown members and groups.
const PLACEHOLDER_TAIL: usize = 6;

/// Display names of members and groups, keyed by id.
///
/// Built once per load and passed to listings explicitly. Unknown ids
/// resolve to a placeholder built from the end of the id, so a dangling
/// reference still shows something recognisable.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NameLookup {
    members: HashMap<DocumentId, String>,
    groups: HashMap<DocumentId, String>,
}

impl NameLookup {
    /// Indexes the names of `members` and `groups`.
    pub fn new<'a, M, G>(members: M, groups: G) -> Self
    where
        M: IntoIterator<Item = &'a Member>,
        G: IntoIterator<Item = &'a Group>,
    {
        Self {
            members: members
                .into_iter()
                .map(|member| (member.id.clone(), member.full_name()))
                .collect(),
            groups: groups
                .into_iter()
                .map(|group| (group.id.clone(), group.name.trim().to_string()))
                .collect(),
        }
    }

    /// The name of a member, or `Membre <tail>` if unknown.
    #[must_use]
    pub fn member_name(&self, id: &DocumentId) -> Cow<'_, str> {
        self.members.get(id).map_or_else(
            || Cow::Owned(format!("Membre {}", id.tail(PLACEHOLDER_TAIL))),
            |name| Cow::Borrowed(name.as_str()),
        )
    }

    /// The name of a group, or `Groupe <tail>` if unknown.
    #[must_use]
    pub fn group_name(&self, id: &DocumentId) -> Cow<'_, str> {
        self.groups.get(id).map_or_else(
            || Cow::Owned(format!("Groupe {}", id.tail(PLACEHOLDER_TAIL))),
            |name| Cow::Borrowed(name.as_str()),
        )
    }

    /// The name of a member or group.
    #[must_use]
    pub fn subscriber_name(&self, subscriber: &Subscriber) -> Cow<'_, str> {
        match subscriber {
            Subscriber::Member(id) => self.member_name(id),
            Subscriber::Group(id) => self.group_name(id),
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use test_case::test_case;

    use super::*;
    use crate::domain::demand::tests::id;

    fn lookup() -> NameLookup {
        let member = Member {
            id: id("MEM_1"),
            matricule: "0001.MK.010126".to_string(),
            first_name: "Awa".to_string(),
            last_name: "Ndiaye".to_string(),
            contacts: Vec::new(),
            email: None,
            group_id: None,
            created_at: Utc::now(),
        };
        let group = Group {
            id: id("GRP_1"),
            name: "Tontine des femmes".to_string(),
            label: None,
            created_at: Utc::now(),
        };
        NameLookup::new([&member], [&group])
    }

    #[test_case(Subscriber::Member(id("MEM_1")) => "Awa Ndiaye"; "known member")]
    #[test_case(Subscriber::Group(id("GRP_1")) => "Tontine des femmes"; "known group")]
    #[test_case(Subscriber::Member(id("x7Kp2QabcDEF12")) => "Membre cDEF12"; "unknown member")]
    #[test_case(Subscriber::Group(id("9f3a0c2b11e4")) => "Groupe 2b11e4"; "unknown group")]
    #[test_case(Subscriber::Member(id("AB")) => "Membre AB"; "short id")]
    fn resolves_names(subscriber: Subscriber) -> String {
        lookup().subscriber_name(&subscriber).into_owned()
    }

    #[test]
    fn ids_are_not_shared_between_members_and_groups() {
        assert_eq!(lookup().group_name(&id("MEM_1")), "Groupe MEM_1");
    }
}

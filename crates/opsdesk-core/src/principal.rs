//! Authenticated principals and dashboard roles.

use serde::de::{self, IgnoredAny, MapAccess, SeqAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::types::UserId;

/// Dashboard role stored on a user's profile.
///
/// Deserialization is lenient: any value other than the string `admin`
/// (case-insensitive), including `null` and non-string values, maps to
/// [`Role::User`], so a corrupted role column can only ever reduce
/// privilege.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(into = "String")]
pub enum Role {
    /// Full access to every page, regardless of allow-lists.
    Admin,
    /// Regular user, subject to the per-path allow-list.
    #[default]
    User,
}

impl Role {
    /// Whether this role bypasses page restrictions.
    #[must_use]
    pub fn is_admin(self) -> bool {
        matches!(self, Self::Admin)
    }

    /// Wire name of the role.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::User => "user",
        }
    }
}

impl From<String> for Role {
    fn from(value: String) -> Self {
        if value.trim().eq_ignore_ascii_case("admin") {
            Self::Admin
        } else {
            Self::User
        }
    }
}

struct RoleVisitor;

impl<'de> Visitor<'de> for RoleVisitor {
    type Value = Role;

    fn expecting(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("a role name")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Role, E> {
        Ok(Role::from(v.to_owned()))
    }

    fn visit_bool<E: de::Error>(self, _: bool) -> Result<Role, E> {
        Ok(Role::User)
    }

    fn visit_i64<E: de::Error>(self, _: i64) -> Result<Role, E> {
        Ok(Role::User)
    }

    fn visit_u64<E: de::Error>(self, _: u64) -> Result<Role, E> {
        Ok(Role::User)
    }

    fn visit_f64<E: de::Error>(self, _: f64) -> Result<Role, E> {
        Ok(Role::User)
    }

    fn visit_unit<E: de::Error>(self) -> Result<Role, E> {
        Ok(Role::User)
    }

    fn visit_none<E: de::Error>(self) -> Result<Role, E> {
        Ok(Role::User)
    }

    fn visit_some<D: Deserializer<'de>>(self, deserializer: D) -> Result<Role, D::Error> {
        deserializer.deserialize_any(self)
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Role, A::Error> {
        while seq.next_element::<IgnoredAny>()?.is_some() {}
        Ok(Role::User)
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Role, A::Error> {
        while map.next_entry::<IgnoredAny, IgnoredAny>()?.is_some() {}
        Ok(Role::User)
    }
}

impl<'de> Deserialize<'de> for Role {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(RoleVisitor)
    }
}

impl From<Role> for String {
    fn from(role: Role) -> Self {
        role.as_str().to_owned()
    }
}

impl std::str::FromStr for Role {
    type Err = CoreError;

    /// Strict parse used for operator input.
    fn from_str(s: &str) -> CoreResult<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "admin" => Ok(Self::Admin),
            "user" => Ok(Self::User),
            _ => Err(CoreError::UnknownRole(s.to_owned())),
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A signed-in user as reported by the identity provider.
///
/// Role and allow-list are deliberately absent: they live on the profile and
/// are fetched per check, never cached on the principal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    /// Provider-issued user id.
    pub id: UserId,
    /// Sign-in email.
    pub email: String,
    /// Display name, when the provider has one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl Principal {
    /// Create a principal without a display name.
    #[must_use]
    pub fn new(id: UserId, email: impl Into<String>) -> Self {
        Self {
            id,
            email: email.into(),
            name: None,
        }
    }

    /// Attach a display name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Name to show in audit trails: the display name, else the email.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.name
            .as_deref()
            .filter(|n| !n.trim().is_empty())
            .unwrap_or(&self.email)
    }
}

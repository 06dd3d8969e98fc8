// src/model/role.rs

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Index, IndexMut};

/// One of the four fixed echelons of the chain, ordered downstream to upstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Retailer,
    Wholesaler,
    Distributor,
    Factory,
}

/// Who a role orders from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Upstream {
    Role(Role),
    Production,
}

/// Who a role ships to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Downstream {
    Role(Role),
    Consumer,
}

impl Role {
    pub const ALL: [Role; 4] = [
        Role::Retailer,
        Role::Wholesaler,
        Role::Distributor,
        Role::Factory,
    ];

    pub const fn index(self) -> usize {
        self as usize
    }

    pub fn upstream(self) -> Upstream {
        match self {
            Role::Retailer => Upstream::Role(Role::Wholesaler),
            Role::Wholesaler => Upstream::Role(Role::Distributor),
            Role::Distributor => Upstream::Role(Role::Factory),
            Role::Factory => Upstream::Production,
        }
    }

    pub fn downstream(self) -> Downstream {
        match self {
            Role::Retailer => Downstream::Consumer,
            Role::Wholesaler => Downstream::Role(Role::Retailer),
            Role::Distributor => Downstream::Role(Role::Wholesaler),
            Role::Factory => Downstream::Role(Role::Distributor),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Retailer => "RETAILER",
            Role::Wholesaler => "WHOLESALER",
            Role::Distributor => "DISTRIBUTOR",
            Role::Factory => "FACTORY",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A fixed-size table with exactly one slot per role.
///
/// Replaces string-keyed lookups so a missing role is a compile error rather
/// than a silent `undefined`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PerRole<T>([T; 4]);

impl<T> PerRole<T> {
    pub fn new(values: [T; 4]) -> Self {
        Self(values)
    }

    pub fn from_fn(mut f: impl FnMut(Role) -> T) -> Self {
        Self(Role::ALL.map(|role| f(role)))
    }

    /// Builds the table role by role, stopping at the first error.
    pub fn try_from_fn<E>(mut f: impl FnMut(Role) -> Result<T, E>) -> Result<Self, E> {
        let [a, b, c, d] = Role::ALL;
        Ok(Self([f(a)?, f(b)?, f(c)?, f(d)?]))
    }

    pub fn iter(&self) -> impl Iterator<Item = (Role, &T)> {
        Role::ALL.into_iter().zip(self.0.iter())
    }

    pub fn values(&self) -> impl Iterator<Item = &T> {
        self.0.iter()
    }

    pub fn map<U>(&self, mut f: impl FnMut(Role, &T) -> U) -> PerRole<U> {
        PerRole::from_fn(|role| f(role, &self.0[role.index()]))
    }

    pub fn into_inner(self) -> [T; 4] {
        self.0
    }
}

impl<T> Index<Role> for PerRole<T> {
    type Output = T;

    fn index(&self, role: Role) -> &T {
        &self.0[role.index()]
    }
}

impl<T> IndexMut<Role> for PerRole<T> {
    fn index_mut(&mut self, role: Role) -> &mut T {
        &mut self.0[role.index()]
    }
}

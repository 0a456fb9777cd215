//! Per-build mapper registry
//!
//! `MapperCache` hands out addresses in registration order starting at zero. Each address is the
//! slot the mapper occupies in the [`MapperTable`] produced by [`MapperCache::freeze`], so a
//! mapper can refer to a sibling by address before that sibling has been built.

use std::collections::HashMap;
use std::ops::Index;
use std::sync::Arc;

use error_stack::Report;
use serde::Serialize;
use tracing::trace;

use crate::error::{Error, Result};
use crate::mapper::Mapper;
use crate::type_pair::TypePair;

/// Position of a mapper in its build's [`MapperTable`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct Address(usize);

impl Address {
    /// Zero-based slot index
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

impl std::fmt::Display for Address {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One registration
#[derive(Debug)]
pub struct MapperCacheItem {
    type_pair: TypePair,
    address:   Address,
    mapper:    Option<Arc<dyn Mapper>>,
}

impl MapperCacheItem {
    /// The registered pair
    #[must_use]
    pub const fn type_pair(&self) -> &TypePair {
        &self.type_pair
    }

    /// The slot assigned at registration
    #[must_use]
    pub const fn address(&self) -> Address {
        self.address
    }

    /// The registered mapper, `None` while the slot is a placeholder
    #[must_use]
    pub const fn mapper(&self) -> Option<&Arc<dyn Mapper>> {
        self.mapper.as_ref()
    }

    /// Whether the slot has been reserved but not filled
    #[must_use]
    pub const fn is_placeholder(&self) -> bool {
        self.mapper.is_none()
    }
}

/// Ordered `TypePair -> mapper` registry scoped to one build
///
/// Append-only: a pair is registered at most once and keeps its first address.
#[derive(Debug, Default)]
pub struct MapperCache {
    items:     Vec<MapperCacheItem>,
    addresses: HashMap<TypePair, Address>,
}

impl MapperCache {
    /// Create an empty cache
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of registered pairs
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether nothing has been registered
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Address of `pair` if it has been registered
    #[must_use]
    pub fn address_of(&self, pair: &TypePair) -> Option<Address> {
        self.addresses.get(pair).copied()
    }

    /// Register `pair` without a mapper yet
    ///
    /// Used before recursing into a pair's children so that a child referring back to the pair
    /// resolves to this address instead of building it again. Returns the existing address when
    /// the pair is already registered.
    pub fn reserve(&mut self, pair: TypePair) -> Address {
        if let Some(address) = self.address_of(&pair) {
            return address;
        }
        let address = Address(self.items.len());
        self.addresses.insert(pair.clone(), address);
        self.items.push(MapperCacheItem {
            type_pair: pair,
            address,
            mapper: None,
        });
        address
    }

    /// Register `mapper` for `pair`
    ///
    /// If `pair` already has an entry its address is returned and no duplicate is created; a
    /// reserved placeholder is filled with `mapper`, an already filled slot keeps its mapper.
    pub fn add(&mut self, pair: TypePair, mapper: Arc<dyn Mapper>) -> Address {
        let address = self.reserve(pair);
        let item = &mut self.items[address.index()];
        if item.mapper.is_none() {
            item.mapper = Some(mapper);
        } else {
            trace!(pair = %item.type_pair, %address, "Pair already registered, keeping first mapper");
        }
        address
    }

    /// Drop every registration at or after address `len`
    ///
    /// Rolls back the reservations of a resolution that failed, so a later attempt for the same
    /// pairs starts from scratch instead of finding unfilled placeholders.
    pub fn truncate(&mut self, len: usize) {
        let start = len.min(self.items.len());
        for item in self.items.drain(start..) {
            self.addresses.remove(&item.type_pair);
        }
    }

    /// Registered items in address order
    pub fn entries(&self) -> impl ExactSizeIterator<Item = &MapperCacheItem> {
        self.items.iter()
    }

    /// Freeze the registered mappers into a table ordered by address
    ///
    /// # Errors
    ///
    /// Fails with `InvalidState` if any reserved slot was never filled.
    pub fn freeze(self) -> Result<MapperTable> {
        let mappers = self
            .items
            .into_iter()
            .map(|item| {
                item.mapper.ok_or_else(|| {
                    Report::new(Error::InvalidState(format!(
                        "mapper for {} at address {} was reserved but never built",
                        item.type_pair, item.address
                    )))
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(MapperTable(mappers.into()))
    }
}

/// Immutable mapper slots of one finished build, indexed by [`Address`]
#[derive(Debug, Clone)]
pub struct MapperTable(Arc<[Arc<dyn Mapper>]>);

impl MapperTable {
    /// Number of slots
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the table has no slots
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Mapper at `address`
    #[must_use]
    pub fn get(&self, address: Address) -> Option<&Arc<dyn Mapper>> {
        self.0.get(address.index())
    }

    /// Every slot with its address
    pub fn iter(&self) -> impl Iterator<Item = (Address, &Arc<dyn Mapper>)> {
        self.0
            .iter()
            .enumerate()
            .map(|(index, mapper)| (Address(index), mapper))
    }
}

impl Index<Address> for MapperTable {
    type Output = Arc<dyn Mapper>;

    fn index(&self, address: Address) -> &Self::Output {
        &self.0[address.index()]
    }
}

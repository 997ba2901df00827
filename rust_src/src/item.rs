//! Items, their IRT parameters, and the read-only item pool.

use std::borrow::Borrow;
use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::PoolError;

/// Opaque item identifier, unique within a pool. Ordering is used to break
/// selection ties.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(String);

impl ItemId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for ItemId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ItemId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for ItemId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Fully specified item parameters. Slipping is carried for completeness;
/// none of the supported models read it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IrtParameters {
    pub difficulty: f64,
    pub discrimination: f64,
    pub guessing: f64,
    pub slipping: f64,
}

impl Default for IrtParameters {
    fn default() -> Self {
        Self {
            difficulty: 0.0,
            discrimination: 1.0,
            guessing: 0.0,
            slipping: 0.0,
        }
    }
}

impl IrtParameters {
    pub fn two_pl(discrimination: f64, difficulty: f64) -> Self {
        Self {
            difficulty,
            discrimination,
            ..Self::default()
        }
    }

    pub fn three_pl(discrimination: f64, difficulty: f64, guessing: f64) -> Self {
        Self {
            difficulty,
            discrimination,
            guessing,
            ..Self::default()
        }
    }

    /// Zip per-item parameter columns into records. Missing guessing is
    /// zero; every column must be as long as `discrimination`.
    pub fn from_columns(
        discrimination: &[f64],
        difficulty: &[f64],
        guessing: Option<&[f64]>,
    ) -> Result<Vec<Self>, PoolError> {
        let expected = discrimination.len();
        let check = |column: &'static str, len: usize| {
            if len == expected {
                Ok(())
            } else {
                Err(PoolError::ColumnLength {
                    column,
                    len,
                    expected,
                })
            }
        };
        check("difficulty", difficulty.len())?;
        if let Some(g) = guessing {
            check("guessing", g.len())?;
        }
        Ok(discrimination
            .iter()
            .zip(difficulty)
            .enumerate()
            .map(|(j, (&a, &b))| Self::three_pl(a, b, guessing.map_or(0.0, |g| g[j])))
            .collect())
    }

    fn validate(&self, id: &ItemId) -> Result<(), PoolError> {
        let invalid = |field: &'static str, value: f64| PoolError::InvalidParameter {
            id: id.to_string(),
            field,
            value,
        };
        if !self.difficulty.is_finite() {
            return Err(invalid("difficulty", self.difficulty));
        }
        if !(self.discrimination.is_finite() && self.discrimination > 0.0) {
            return Err(invalid("discrimination", self.discrimination));
        }
        if !(0.0..1.0).contains(&self.guessing) {
            return Err(invalid("guessing", self.guessing));
        }
        if !(0.0..1.0).contains(&self.slipping) {
            return Err(invalid("slipping", self.slipping));
        }
        Ok(())
    }
}

/// One question drawn from the pool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    pub id: ItemId,
    pub irt_parameters: IrtParameters,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_category: Option<String>,
}

impl Item {
    pub fn new(id: impl Into<ItemId>, irt_parameters: IrtParameters) -> Self {
        Self {
            id: id.into(),
            irt_parameters,
            content_category: None,
        }
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.content_category = Some(category.into());
        self
    }
}

/// Item as stored by a host: every parameter optional.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawItem {
    id: String,
    #[serde(default)]
    irt_parameters: RawParameters,
    #[serde(default)]
    content_category: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawParameters {
    difficulty: Option<f64>,
    discrimination: Option<f64>,
    guessing: Option<f64>,
    slipping: Option<f64>,
}

impl From<RawItem> for Item {
    fn from(raw: RawItem) -> Self {
        let defaults = IrtParameters::default();
        let p = raw.irt_parameters;
        Self {
            id: ItemId(raw.id),
            irt_parameters: IrtParameters {
                difficulty: p.difficulty.unwrap_or(defaults.difficulty),
                discrimination: p.discrimination.unwrap_or(defaults.discrimination),
                guessing: p.guessing.unwrap_or(defaults.guessing),
                slipping: p.slipping.unwrap_or(defaults.slipping),
            },
            content_category: raw.content_category,
        }
    }
}

/// Validated, immutable collection of items. Safe to share across sessions.
#[derive(Debug, Clone, Default)]
pub struct ItemPool {
    items: Vec<Item>,
    index: HashMap<ItemId, usize>,
}

impl ItemPool {
    pub fn new(items: Vec<Item>) -> Result<Self, PoolError> {
        let mut index = HashMap::with_capacity(items.len());
        for (i, item) in items.iter().enumerate() {
            item.irt_parameters.validate(&item.id)?;
            if index.insert(item.id.clone(), i).is_some() {
                return Err(PoolError::DuplicateItemId(item.id.to_string()));
            }
        }
        Ok(Self { items, index })
    }

    /// Load a JSON array of items, resolving missing parameters to defaults.
    pub fn from_json_str(json: &str) -> Result<Self, PoolError> {
        let raw: Vec<RawItem> =
            serde_json::from_str(json).map_err(|e| PoolError::Parse(e.to_string()))?;
        Self::new(raw.into_iter().map(Item::from).collect())
    }

    pub fn get(&self, id: &str) -> Option<&Item> {
        self.index.get(id).map(|&i| &self.items[i])
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub fn items(&self) -> &[Item] {
        &self.items
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Item> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl<'a> IntoIterator for &'a ItemPool {
    type Item = &'a Item;
    type IntoIter = std::slice::Iter<'a, Item>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

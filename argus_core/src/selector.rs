// argus_core/src/selector.rs

//! Query-side narrowing of a referential down to one segment.
//!
//! `SegmentSelector` is a small state machine: its state is the partial key chosen so
//! far plus the matching candidates; each `choose` fixes one more field in the order
//! brand, model, year, fuel, transmission, power, trim. It ends on a unique record or
//! on an empty candidate set, from which the caller may `reset` and start over.

use crate::listing;
use crate::referential;

/// One field of the segment key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyField {
    Brand,
    Model,
    Year,
    Fuel,
    Transmission,
    Power,
    Trim,
}

impl KeyField {
    /// Order in which an operator narrows the referential.
    pub const SELECTION_ORDER: [KeyField; 7] = [
        KeyField::Brand,
        KeyField::Model,
        KeyField::Year,
        KeyField::Fuel,
        KeyField::Transmission,
        KeyField::Power,
        KeyField::Trim,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            KeyField::Brand => "BRAND",
            KeyField::Model => "MODEL",
            KeyField::Year => "YEAR",
            KeyField::Fuel => "FUEL",
            KeyField::Transmission => "TRANSMISSION",
            KeyField::Power => "POWER",
            KeyField::Trim => "TRIM",
        }
    }

    /// Value of this field in `key`.
    pub fn value_of(&self, key: &listing::SegmentKey) -> FieldValue {
        match self {
            KeyField::Brand => FieldValue::Text(key.brand.clone()),
            KeyField::Model => FieldValue::Text(key.model.clone()),
            KeyField::Year => FieldValue::Number(key.year),
            KeyField::Fuel => FieldValue::Text(key.fuel.clone()),
            KeyField::Transmission => FieldValue::Text(key.transmission.clone()),
            KeyField::Power => FieldValue::Number(key.power),
            KeyField::Trim => FieldValue::Text(key.trim.clone()),
        }
    }
}

/// Value of a key field. Numbers sort numerically, text lexicographically.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FieldValue {
    Number(u32),
    Text(String),
}

impl FieldValue {
    /// Parses `raw` into the value type expected by `field`.
    pub fn parse(field: KeyField, raw: &str) -> Option<Self> {
        match field {
            KeyField::Year | KeyField::Power => raw.trim().parse::<u32>().ok().map(FieldValue::Number),
            _ => Some(FieldValue::Text(listing::normalize_label(raw))),
        }
    }
}

impl std::fmt::Display for FieldValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FieldValue::Number(value) => write!(f, "{}", value),
            FieldValue::Text(value) => f.write_str(value),
        }
    }
}

/// Operator-facing power label: "110 ch", or "Standard" when unknown.
pub fn power_label(power: u32) -> String {
    if power > 0 { format!("{} ch", power) } else { "Standard".to_string() }
}

/// Segment key with optional fields. Unset fields match anything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PartialKey {
    pub brand: Option<String>,
    pub model: Option<String>,
    pub year: Option<u32>,
    pub power: Option<u32>,
    pub fuel: Option<String>,
    pub transmission: Option<String>,
    pub trim: Option<String>,
}

impl PartialKey {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets `field` to `value`. A value of the wrong kind sets nothing and returns `false`.
    pub fn set(&mut self, field: KeyField, value: FieldValue) -> bool {
        match (field, value) {
            (KeyField::Brand, FieldValue::Text(v)) => self.brand = Some(v),
            (KeyField::Model, FieldValue::Text(v)) => self.model = Some(v),
            (KeyField::Year, FieldValue::Number(v)) => self.year = Some(v),
            (KeyField::Fuel, FieldValue::Text(v)) => self.fuel = Some(v),
            (KeyField::Transmission, FieldValue::Text(v)) => self.transmission = Some(v),
            (KeyField::Power, FieldValue::Number(v)) => self.power = Some(v),
            (KeyField::Trim, FieldValue::Text(v)) => self.trim = Some(v),
            _ => return false,
        }
        true
    }

    pub fn with(mut self, field: KeyField, value: FieldValue) -> Self {
        self.set(field, value);
        self
    }

    pub fn matches(&self, key: &listing::SegmentKey) -> bool {
        fn eq<T: PartialEq>(wanted: &Option<T>, actual: &T) -> bool {
            wanted.as_ref().is_none_or(|w| w == actual)
        }

        eq(&self.brand, &key.brand)
            && eq(&self.model, &key.model)
            && eq(&self.year, &key.year)
            && eq(&self.power, &key.power)
            && eq(&self.fuel, &key.fuel)
            && eq(&self.transmission, &key.transmission)
            && eq(&self.trim, &key.trim)
    }
}

/// Result of one selection step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Selection<'a> {
    /// More fields remain to be chosen.
    Narrowed { remaining: usize },
    /// Every field is fixed and exactly one record matches.
    Unique(&'a referential::ReferenceRecord),
    /// No record matches the partial key.
    NoMatch,
}

/// Finite-state filter refinement over a referential table.
#[derive(Debug, Clone)]
pub struct SegmentSelector<'a> {
    table: &'a referential::ReferentialTable,
    partial: PartialKey,
    step: usize,
    candidates: Vec<&'a referential::ReferenceRecord>,
}

impl<'a> SegmentSelector<'a> {
    pub fn new(table: &'a referential::ReferentialTable) -> Self {
        Self {
            table,
            partial: PartialKey::new(),
            step: 0,
            candidates: table.iter().collect(),
        }
    }

    /// Back to the initial state: nothing chosen, every record a candidate.
    pub fn reset(&mut self) {
        *self = Self::new(self.table);
    }

    pub fn get_partial_key(&self) -> &PartialKey {
        &self.partial
    }

    pub fn get_candidates(&self) -> &[&'a referential::ReferenceRecord] {
        &self.candidates
    }

    /// Next field to choose, `None` once every field is fixed.
    pub fn next_field(&self) -> Option<KeyField> {
        KeyField::SELECTION_ORDER.get(self.step).copied()
    }

    /// Sorted unique values of the next field among the current candidates.
    pub fn options(&self) -> Vec<FieldValue> {
        let Some(field) = self.next_field() else { return Vec::new(); };

        let values: std::collections::BTreeSet<FieldValue> = self
            .candidates
            .iter()
            .map(|record| field.value_of(&record.key))
            .collect();

        values.into_iter().collect()
    }

    /// Brands containing `fragment` (case-insensitive), sorted.
    pub fn search_brands(&self, fragment: &str) -> Vec<String> {
        let needle = listing::normalize_label(fragment);
        let brands: std::collections::BTreeSet<&str> = self
            .table
            .iter()
            .map(|record| record.key.brand.as_str())
            .filter(|brand| brand.contains(needle.as_str()))
            .collect();

        brands.into_iter().map(str::to_string).collect()
    }

    /// Fixes the next field to `value` and narrows the candidates.
    pub fn choose(&mut self, value: FieldValue) -> Selection<'a> {
        let Some(field) = self.next_field() else { return self.current(); };

        if !self.partial.set(field, value) {
            self.candidates.clear();
        } else {
            let partial = &self.partial;
            self.candidates.retain(|record| partial.matches(&record.key));
        }
        self.step += 1;

        self.current()
    }

    /// Chooses every upcoming field that has a single option, except the model,
    /// which the operator always confirms.
    ///
    /// # Returns
    /// * The selection after the last automatic choice, or `None` if nothing was chosen.
    pub fn auto_advance(&mut self) -> Option<Selection<'a>> {
        let mut last = None;

        while let Some(field) = self.next_field() {
            if field == KeyField::Model { break; }

            let mut options = self.options();
            if options.len() != 1 { break; }

            let selection = self.choose(options.remove(0));
            last = Some(selection);
            if !matches!(selection, Selection::Narrowed { .. }) { break; }
        }

        last
    }

    /// State of the selection without choosing anything.
    pub fn current(&self) -> Selection<'a> {
        if self.candidates.is_empty() {
            return Selection::NoMatch;
        }

        match self.next_field() {
            Some(_) => Selection::Narrowed { remaining: self.candidates.len() },
            None => Selection::Unique(self.candidates[0]),
        }
    }
}

use std::collections::{BTreeSet, HashMap, HashSet};

use indexmap::IndexMap;

use crate::element::{Element, ElementId};
use crate::logging::{LogLevel, Logger, json_kv, json_str};

use super::audit::{AuditAction, AuditEntry, AuditEntryBuilder};

const LOG_TARGET: &str = "chalkboard::registry";

/// Minimum token-overlap score a fuzzy description match must beat.
pub const FUZZY_THRESHOLD: f64 = 0.7;

#[derive(Debug, Clone)]
struct Record {
    element: Element,
    description: Option<String>,
}

/// Directory of every element and group on one board: semantic description
/// index, symmetric relationship graph, and the audit trail.
#[derive(Default)]
pub struct EntityRegistry {
    records: IndexMap<ElementId, Record>,
    index: HashMap<String, ElementId>,
    relationships: HashMap<ElementId, BTreeSet<ElementId>>,
    audit: Vec<AuditEntry>,
    next_id: u64,
    logger: Option<Logger>,
}

impl EntityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_logger(mut self, logger: Logger) -> Self {
        self.logger = Some(logger);
        self
    }

    pub fn set_logger(&mut self, logger: Option<Logger>) {
        self.logger = logger;
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Elements in registration order.
    pub fn elements(&self) -> impl Iterator<Item = &Element> {
        self.records.values().map(|record| &record.element)
    }

    /// Store `element`. The id is `explicit_id`, else the element's own id,
    /// else a freshly minted `entity-N`.
    pub fn register_element(
        &mut self,
        mut element: Element,
        description: Option<&str>,
        explicit_id: Option<&str>,
    ) -> ElementId {
        let id = match explicit_id.filter(|id| !id.is_empty()) {
            Some(id) => id.to_string(),
            None if !element.id.is_empty() => element.id.clone(),
            None => self.mint_id(),
        };
        element.id = id.clone();

        let description = description
            .map(str::trim)
            .filter(|desc| !desc.is_empty())
            .map(str::to_string);
        if let Some(desc) = description.as_deref() {
            self.index_description(&id, desc);
        }

        self.records.insert(
            id.clone(),
            Record {
                element,
                description: description.clone(),
            },
        );
        self.relationships.entry(id.clone()).or_default();
        self.audit.push(
            AuditEntryBuilder::new(AuditAction::Register)
                .detail("id", id.as_str())
                .detail("description", description.clone())
                .finish(),
        );
        self.log(
            LogLevel::Debug,
            "element_registered",
            [
                json_str("id", id.as_str()),
                json_kv("description", description),
            ],
        );
        id
    }

    /// Apply `change` to a stored element. The id itself cannot change.
    pub fn update_element<F>(&mut self, id: &str, change: F) -> bool
    where
        F: FnOnce(&mut Element),
    {
        let Some(record) = self.records.get_mut(id) else {
            return false;
        };
        change(&mut record.element);
        record.element.id = id.to_string();
        self.audit.push(
            AuditEntryBuilder::new(AuditAction::Update)
                .detail("id", id)
                .finish(),
        );
        true
    }

    /// Replace the description an element is indexed under.
    pub fn redescribe(&mut self, id: &str, description: &str) -> bool {
        if !self.records.contains_key(id) {
            return false;
        }
        self.index.retain(|_, target| target != id);
        let description = description.trim();
        if !description.is_empty() {
            self.index_description(id, description);
        }
        if let Some(record) = self.records.get_mut(id) {
            record.description = Some(description.to_string()).filter(|d| !d.is_empty());
        }
        self.audit.push(
            AuditEntryBuilder::new(AuditAction::Update)
                .detail("id", id)
                .detail("description", description)
                .finish(),
        );
        true
    }

    pub fn find_element(&self, id: &str) -> Option<&Element> {
        self.records.get(id).map(|record| &record.element)
    }

    pub fn description_of(&self, id: &str) -> Option<&str> {
        self.records.get(id)?.description.as_deref()
    }

    /// Exact (case-insensitive) description match, falling back to the best
    /// token-overlap match scoring above [`FUZZY_THRESHOLD`]. Ties go to the
    /// earliest registration.
    pub fn find_element_by_description(&self, description: &str) -> Option<&Element> {
        let key = description.trim().to_lowercase();
        if key.is_empty() {
            return None;
        }
        if let Some(record) = self.index.get(&key).and_then(|id| self.records.get(id)) {
            return Some(&record.element);
        }

        let wanted = tokens(&key);
        let mut best: Option<(f64, &Record)> = None;
        for record in self.records.values() {
            let Some(stored) = record.description.as_deref() else {
                continue;
            };
            let score = similarity_tokens(&wanted, &tokens(stored));
            if best.is_none_or(|(top, _)| score > top) {
                best = Some((score, record));
            }
        }

        best.filter(|(score, _)| *score > FUZZY_THRESHOLD)
            .map(|(_, record)| &record.element)
    }

    /// Description lookup first, id lookup as fallback.
    pub fn resolve(&self, reference: &str) -> Option<&Element> {
        self.find_element_by_description(reference)
            .or_else(|| self.find_element(reference.trim()))
    }

    /// Resolve both sides independently; unresolved sides come back `None`.
    pub fn resolve_references(
        &self,
        from: &str,
        to: &str,
    ) -> (Option<&Element>, Option<&Element>) {
        (self.resolve(from), self.resolve(to))
    }

    /// Add a symmetric edge between two registered ids. Returns `true` only
    /// when the edge is new.
    pub fn add_relationship(&mut self, a: &str, b: &str) -> bool {
        if a == b || !self.records.contains_key(a) || !self.records.contains_key(b) {
            return false;
        }
        let added = self
            .relationships
            .entry(a.to_string())
            .or_default()
            .insert(b.to_string());
        self.relationships
            .entry(b.to_string())
            .or_default()
            .insert(a.to_string());
        if added {
            self.audit.push(
                AuditEntryBuilder::new(AuditAction::Relate)
                    .detail("a", a)
                    .detail("b", b)
                    .finish(),
            );
        }
        added
    }

    pub fn connections(&self, id: &str) -> Vec<&str> {
        self.relationships
            .get(id)
            .map(|set| set.iter().map(String::as_str).collect())
            .unwrap_or_default()
    }

    pub fn are_connected(&self, a: &str, b: &str) -> bool {
        self.relationships
            .get(a)
            .is_some_and(|set| set.contains(b))
    }

    /// Delete an element, its description entries and every edge touching it.
    pub fn remove_element(&mut self, id: &str) -> Option<Element> {
        let record = self.records.shift_remove(id)?;
        self.index.retain(|_, target| target != id);
        if let Some(peers) = self.relationships.remove(id) {
            for peer in peers {
                if let Some(set) = self.relationships.get_mut(&peer) {
                    set.remove(id);
                }
            }
        }
        self.audit.push(
            AuditEntryBuilder::new(AuditAction::Remove)
                .detail("id", id)
                .finish(),
        );
        self.log(
            LogLevel::Debug,
            "element_removed",
            [json_str("id", id)],
        );
        Some(record.element)
    }

    /// Drop every element and edge. The audit log and id counter survive.
    pub fn clear(&mut self) {
        let removed = self.records.len();
        self.records.clear();
        self.index.clear();
        self.relationships.clear();
        self.audit.push(
            AuditEntryBuilder::new(AuditAction::Clear)
                .detail("removed", removed)
                .finish(),
        );
    }

    pub fn history(&self) -> &[AuditEntry] {
        &self.audit
    }

    fn mint_id(&mut self) -> ElementId {
        loop {
            self.next_id += 1;
            let id = format!("entity-{}", self.next_id);
            if !self.records.contains_key(&id) {
                return id;
            }
        }
    }

    fn index_description(&mut self, id: &str, description: &str) {
        let key = description.to_lowercase();
        if let Some(previous) = self.index.get(&key).filter(|previous| *previous != id) {
            self.log(
                LogLevel::Debug,
                "description_reassigned",
                [
                    json_str("description", key.as_str()),
                    json_str("previous", previous.as_str()),
                    json_str("id", id),
                ],
            );
        }
        self.index.insert(key, id.to_string());
    }

    fn log<I>(&self, level: LogLevel, message: &str, fields: I)
    where
        I: IntoIterator<Item = (String, serde_json::Value)>,
    {
        if let Some(logger) = self.logger.as_ref() {
            logger.emit(level, LOG_TARGET, message, fields);
        }
    }
}

fn tokens(text: &str) -> HashSet<String> {
    text.split_whitespace()
        .map(|token| {
            token
                .trim_matches(|c: char| !c.is_alphanumeric())
                .to_lowercase()
        })
        .filter(|token| !token.is_empty())
        .collect()
}

fn similarity_tokens(a: &HashSet<String>, b: &HashSet<String>) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let shared = a.intersection(b).count();
    2.0 * shared as f64 / (a.len() + b.len()) as f64
}

/// Token-overlap (Dice) similarity between two descriptions, in `[0, 1]`.
pub fn similarity(a: &str, b: &str) -> f64 {
    similarity_tokens(&tokens(a), &tokens(b))
}

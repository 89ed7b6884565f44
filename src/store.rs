use crate::field::{Field, FieldValue};
use indexmap::IndexMap;

/// Insertion-ordered mapping from a field name to every field appended under
/// it.
///
/// A name keeps the position of its first append; later appends with the same
/// name only extend that name's list.
#[derive(Debug, Clone, Default)]
pub(crate) struct FieldStore {
    entries: IndexMap<String, Vec<Field>>,
}

impl FieldStore {
    pub(crate) fn new() -> Self {
        FieldStore::default()
    }

    pub(crate) fn append(&mut self, field: Field) {
        self.entries
            .entry(field.name().to_owned())
            .or_default()
            .push(field);
    }

    pub(crate) fn get_all(&self, name: &str) -> Option<&[Field]> {
        self.entries.get(name).map(Vec::as_slice)
    }

    pub(crate) fn has(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    // `shift_remove` keeps the remaining names in insertion order.
    pub(crate) fn delete(&mut self, name: &str) {
        self.entries.shift_remove(name);
    }

    /// The field at `value` within the `entry`-th name, if any.
    pub(crate) fn field_at(&self, entry: usize, value: usize) -> Option<&Field> {
        self.entries
            .get_index(entry)
            .and_then(|(_, fields)| fields.get(value))
    }

    pub(crate) fn entry_count(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.values().map(Vec::len).sum()
    }

    pub(crate) fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.entries.keys().map(String::as_str)
    }

    pub(crate) fn fields(&self) -> impl Iterator<Item = &Field> + '_ {
        self.entries.values().flatten()
    }

    pub(crate) fn values(&self) -> impl Iterator<Item = &FieldValue> + '_ {
        self.fields().map(Field::value)
    }

    pub(crate) fn entries(&self) -> impl Iterator<Item = (&str, &FieldValue)> + '_ {
        self.fields().map(|field| (field.name(), field.value()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::FieldOptions;

    fn field(name: &str, value: &str) -> Field {
        Field::new("X-BOUNDARY", name.to_owned(), value.into(), FieldOptions::new()).unwrap()
    }

    fn texts<'a>(values: impl Iterator<Item = &'a FieldValue>) -> Vec<&'a str> {
        values.map(|value| value.as_text().unwrap()).collect()
    }

    #[test]
    fn test_append_keeps_first_position() {
        let mut store = FieldStore::new();
        store.append(field("a", "1"));
        store.append(field("b", "2"));
        store.append(field("a", "3"));
        store.append(field("c", "4"));

        assert_eq!(store.names().collect::<Vec<_>>(), vec!["a", "b", "c"]);
        assert_eq!(texts(store.values()), vec!["1", "3", "2", "4"]);
        assert_eq!(
            store
                .entries()
                .map(|(name, value)| (name, value.as_text().unwrap()))
                .collect::<Vec<_>>(),
            vec![("a", "1"), ("a", "3"), ("b", "2"), ("c", "4")]
        );
        assert_eq!(store.len(), 4);
        assert_eq!(store.entry_count(), 3);
    }

    #[test]
    fn test_iterators_restart() {
        let mut store = FieldStore::new();
        store.append(field("a", "1"));
        store.append(field("b", "2"));

        let mut first = store.values();
        assert_eq!(first.next().and_then(FieldValue::as_text), Some("1"));

        assert_eq!(texts(store.values()), vec!["1", "2"]);
        assert_eq!(first.next().and_then(FieldValue::as_text), Some("2"));
    }

    #[test]
    fn test_get_all_has_delete() {
        let mut store = FieldStore::new();
        store.append(field("a", "1"));
        store.append(field("a", ""));
        store.append(field("", "empty name"));

        assert!(store.has("a"));
        assert!(store.has(""));
        assert!(!store.has("missing"));
        assert!(store.get_all("missing").is_none());
        assert_eq!(texts(store.get_all("a").unwrap().iter().map(Field::value)), vec!["1", ""]);

        store.delete("a");
        store.delete("missing");

        assert!(!store.has("a"));
        assert!(store.get_all("a").is_none());
        assert_eq!(store.names().collect::<Vec<_>>(), vec![""]);
    }

    #[test]
    fn test_field_at() {
        let mut store = FieldStore::new();
        store.append(field("a", "1"));
        store.append(field("a", "2"));
        store.append(field("b", "3"));

        assert_eq!(store.field_at(0, 1).and_then(|f| f.value().as_text()), Some("2"));
        assert_eq!(store.field_at(1, 0).and_then(|f| f.value().as_text()), Some("3"));
        assert!(store.field_at(0, 2).is_none());
        assert!(store.field_at(2, 0).is_none());
    }

    #[test]
    fn test_delete_keeps_order_of_remaining_names() {
        let mut store = FieldStore::new();
        for name in &["a", "b", "c", "d"] {
            store.append(field(name, name));
        }

        store.delete("b");
        store.append(field("b", "again"));

        assert_eq!(store.names().collect::<Vec<_>>(), vec!["a", "c", "d", "b"]);
        assert_eq!(store.field_at(1, 0).and_then(|f| f.value().as_text()), Some("c"));
        assert_eq!(texts(store.values()), vec!["a", "c", "d", "again"]);
    }
}

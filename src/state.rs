use crate::field::{ByteStream, Field};
use crate::store::FieldStore;
use bytes::Bytes;
use std::sync::Arc;

pub(crate) struct StreamState {
    pub(crate) store: Arc<FieldStore>,
    pub(crate) footer: Bytes,
    pub(crate) stage: StreamingStage,
    pub(crate) curr_entry: usize,
    pub(crate) curr_value: usize,
    pub(crate) curr_body: Option<ByteStream>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum StreamingStage {
    WritingHeader,
    WritingBody,
    ForwardingBody,
    WritingTrailer,
    WritingFooter,
    Eof,
}

impl StreamState {
    pub(crate) fn new(store: Arc<FieldStore>, footer: Bytes) -> Self {
        StreamState {
            store,
            footer,
            stage: StreamingStage::WritingHeader,
            curr_entry: 0,
            curr_value: 0,
            curr_body: None,
        }
    }

    pub(crate) fn curr_field(&self) -> Option<&Field> {
        self.store.field_at(self.curr_entry, self.curr_value)
    }

    /// Moves the cursor to the next field, crossing into the next name once
    /// the current name's list is exhausted.
    pub(crate) fn advance(&mut self) {
        self.curr_value += 1;

        if self.store.field_at(self.curr_entry, self.curr_value).is_none() {
            self.curr_entry += 1;
            self.curr_value = 0;
        }
    }

    pub(crate) fn is_exhausted(&self) -> bool {
        self.curr_entry >= self.store.entry_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::FieldOptions;

    #[test]
    fn test_cursor_walks_in_store_order() {
        let mut store = FieldStore::new();
        for (name, value) in [("a", "1"), ("b", "2"), ("a", "3")].iter() {
            let field = Field::new("X", (*name).to_owned(), (*value).into(), FieldOptions::new()).unwrap();
            store.append(field);
        }

        let mut state = StreamState::new(Arc::new(store), Bytes::new());
        let mut seen = Vec::new();

        while !state.is_exhausted() {
            seen.push(state.curr_field().and_then(|f| f.value().as_text()).unwrap().to_owned());
            state.advance();
        }

        assert_eq!(seen, vec!["1", "3", "2"]);
        assert!(state.curr_field().is_none());
    }

    #[test]
    fn test_empty_store_is_exhausted() {
        let state = StreamState::new(Arc::new(FieldStore::new()), Bytes::new());
        assert!(state.is_exhausted());
        assert_eq!(state.stage, StreamingStage::WritingHeader);
    }
}

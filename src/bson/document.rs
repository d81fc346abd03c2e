use super::de::{limit_reader, parse_element, BsonReader, LimitReader, ParseError};
use super::utils::write_c_string;
use super::{BsonWriter, Value};
use std::borrow::Borrow;
use std::fmt::{Debug, Formatter};
use std::hash::{Hash, Hasher};
use indexmap::IndexMap;

/// The bson document (§3).
///
/// Keys compare case-insensitively, matching the storage engine's
/// collection/field name rules. Field order is preserved on insert, which
/// is load-bearing: the document comparator (§4.6) compares documents
/// field-by-field in insertion order.
#[derive(Clone, PartialEq)]
pub struct Document {
    inner: IndexMap<CaseInsensitiveString, Value>,
}

#[repr(transparent)]
struct CaseInsensitiveStr(str);
#[derive(Clone)]
struct CaseInsensitiveString(String);

impl Document {
    pub fn new() -> Document {
        Self {
            inner: IndexMap::new(),
        }
    }

    /// Adds value to document.
    ///
    /// ### Panics
    /// This function will panic if the key contains null char (`'\0'`)
    pub fn insert(&mut self, key: String, value: impl Into<Value>) {
        check_key(&key);
        self.inner.insert(CaseInsensitiveString(key), value.into());
    }

    /// Gets the value with `key`.
    pub fn get(&self, key: impl AsRef<str>) -> Option<&Value> {
        self.inner.get(CaseInsensitiveStr::new(key.as_ref()))
    }

    pub fn get_mut(&mut self, key: impl AsRef<str>) -> Option<&mut Value> {
        self.inner.get_mut(CaseInsensitiveStr::new(key.as_ref()))
    }

    pub fn contains_key(&self, key: impl AsRef<str>) -> bool {
        self.inner
            .contains_key(CaseInsensitiveStr::new(key.as_ref()))
    }

    pub fn remove(&mut self, key: impl AsRef<str>) -> Option<Value> {
        // `shift_remove` keeps the relative order of the remaining fields,
        // which matters for the comparator rule above.
        self.inner.shift_remove(CaseInsensitiveStr::new(key.as_ref()))
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.inner.iter().map(|(k, v)| (k.0.as_str(), v))
    }
}

impl Default for Document {
    fn default() -> Self {
        Document::new()
    }
}

#[track_caller]
fn check_key(key: &String) {
    assert!(
        !key.as_bytes().contains(&0),
        "Key contains null char, which is disallowed for bson"
    );
}

impl Document {
    /// Size of the serialized document, including its own length prefix and
    /// trailing zero byte.
    pub fn get_serialized_value_len(&self) -> usize {
        4 + self
            .inner
            .iter()
            .map(|(k, v)| 1 + k.0.len() + 1 + v.get_serialized_value_len())
            .sum::<usize>()
            + 1
    }

    pub fn write_value<W: BsonWriter>(&self, w: &mut W) -> Result<(), W::Error> {
        let len = self.get_serialized_value_len();
        let len = i32::try_from(len).map_err(|_| W::when_too_large(len))?;
        w.write_bytes(&len.to_le_bytes())?;
        for (key, value) in self.inner.iter() {
            let tag = value.ty().bson_tag() as i8 as u8;
            w.write_bytes(&[tag])?;
            write_c_string(w, &key.0)?;
            value.write_value(w)?;
        }
        w.write_bytes(&[0])
    }

    /// Parses a whole top-level document, including its length prefix, and
    /// checks that no trailing bytes remain inside it.
    pub fn parse_document<R: BsonReader>(r: &mut R) -> Result<Document, R::Error> {
        let mut limited = limit_reader(r)?;
        let doc = Document::parse_document_inner(&mut limited)?;
        if !limited.is_end() {
            return Err(ParseError::RemainingDataInDocument.into());
        }
        Ok(doc)
    }

    /// Parses document elements from an already-length-limited reader,
    /// stopping at the embedded end-of-document marker. Used both for the
    /// top-level document and for nested documents reached via
    /// [`super::de::parse_element`].
    pub(super) fn parse_document_inner<R: BsonReader>(
        r: &mut LimitReader<R>,
    ) -> Result<Document, R::Error> {
        let mut doc = Document::new();
        while let Some((key, value)) = parse_element(r)? {
            if doc
                .inner
                .insert(CaseInsensitiveString(key.clone()), value)
                .is_some()
            {
                return Err(ParseError::DuplicatedKey(key).into());
            }
        }
        Ok(doc)
    }
}

impl Debug for Document {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_map()
            .entries(self.inner.iter().map(|(k, v)| (&k.0, v)))
            .finish()
    }
}

impl Debug for CaseInsensitiveString {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        Debug::fmt(&self.0, f)
    }
}

impl CaseInsensitiveStr {
    fn new(s: &str) -> &CaseInsensitiveStr {
        // SAFETY: CaseInsensitiveStr is transparent to str
        unsafe { &*(s as *const str as *const CaseInsensitiveStr) }
    }
}

impl Hash for CaseInsensitiveStr {
    fn hash<H: Hasher>(&self, state: &mut H) {
        for c in self.0.chars() {
            for c in c.to_uppercase() {
                state.write_u32(c as u32);
            }
        }
    }
}

impl PartialEq for CaseInsensitiveStr {
    fn eq(&self, other: &Self) -> bool {
        let this = self.0.chars().flat_map(char::to_uppercase);
        let other = other.0.chars().flat_map(char::to_uppercase);
        this.eq(other)
    }
}

impl Eq for CaseInsensitiveStr {}

// basically string implementation is based on CaseInsensitiveStr
impl Borrow<CaseInsensitiveStr> for CaseInsensitiveString {
    fn borrow(&self) -> &CaseInsensitiveStr {
        self.as_ref()
    }
}

impl AsRef<CaseInsensitiveStr> for CaseInsensitiveString {
    fn as_ref(&self) -> &CaseInsensitiveStr {
        CaseInsensitiveStr::new(&self.0)
    }
}

impl Hash for CaseInsensitiveString {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.as_ref().hash(state)
    }
}

impl PartialEq for CaseInsensitiveString {
    fn eq(&self, other: &Self) -> bool {
        self.as_ref().eq(other.as_ref())
    }
}

impl Eq for CaseInsensitiveString {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preserves_insertion_order() {
        let mut doc = Document::new();
        doc.insert("z".into(), 1i32);
        doc.insert("a".into(), 2i32);
        doc.insert("m".into(), 3i32);
        let keys: Vec<_> = doc.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, ["z", "a", "m"]);
    }

    #[test]
    fn lookup_is_case_insensitive() {
        let mut doc = Document::new();
        doc.insert("Name".into(), "value");
        assert_eq!(doc.get("name").and_then(Value::as_str), Some("value"));
        assert_eq!(doc.get("NAME").and_then(Value::as_str), Some("value"));
    }

    #[test]
    #[should_panic]
    fn insert_rejects_null_byte_in_key() {
        let mut doc = Document::new();
        doc.insert("bad\0key".into(), 1i32);
    }
}

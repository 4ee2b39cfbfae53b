use std::fmt;

mod error;

pub use self::error::IntoTupleNameError;

use crate::catalog::HEADER_NAME;

/// The name of a tuple. A tuple name doubles as the file name of the tuple's
/// stream inside the staging directory and the archive, so it is a single
/// NFC-normalized path chunk: no separators, no control characters, and never
/// `.`, `..` or the header entry name.
#[derive(Debug, Clone, PartialOrd, Ord, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct TupleName(pub(crate) String);

pub fn sanitize(name: &str) -> Option<String> {
    use unic_normal::StrNormalForm;
    use unic_ucd::GeneralCategory;

    Some(name)
        .filter(|x| !x.trim().is_empty())
        .filter(|x| {
            !x.chars().any(|c| {
                let cat = GeneralCategory::of(c);
                c == '/'
                    || c == '\\'
                    || cat == GeneralCategory::Control
                    || (cat.is_separator() && c != ' ')
            })
        })
        .map(|x| x.nfc().collect::<String>())
}

impl TupleName {
    pub fn new<S: AsRef<str>>(name: S) -> std::result::Result<TupleName, IntoTupleNameError> {
        let name = name.as_ref();

        if name.is_empty() {
            return Err(IntoTupleNameError::EmptyName);
        }

        let out = sanitize(name).ok_or(IntoTupleNameError::UnrepresentableStr)?;

        if out == "." || out == ".." || out == HEADER_NAME {
            return Err(IntoTupleNameError::Reserved);
        }

        Ok(TupleName(out))
    }

    #[inline(always)]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[inline(always)]
    pub fn into_string(self) -> String {
        self.0
    }
}

impl AsRef<str> for TupleName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TupleName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_names() {
        assert_eq!(TupleName::new("events").unwrap().as_str(), "events");
        assert_eq!(TupleName::new("jets.pt").unwrap().as_str(), "jets.pt");
        assert_eq!(TupleName::new("my tuple").unwrap().as_str(), "my tuple");
    }

    #[test]
    fn separators() {
        assert_eq!(
            TupleName::new("../evil"),
            Err(IntoTupleNameError::UnrepresentableStr)
        );
        assert_eq!(
            TupleName::new("dir/events"),
            Err(IntoTupleNameError::UnrepresentableStr)
        );
        assert_eq!(
            TupleName::new(r"dir\events"),
            Err(IntoTupleNameError::UnrepresentableStr)
        );
    }

    #[test]
    fn control_characters() {
        // Null is a sassy fellow
        assert!(TupleName::new("\0").is_err());
        assert!(TupleName::new("ev\nents").is_err());
        assert!(TupleName::new("ev\u{2028}ents").is_err());
    }

    #[test]
    fn empty_and_blank() {
        assert_eq!(TupleName::new(""), Err(IntoTupleNameError::EmptyName));
        assert_eq!(
            TupleName::new("   "),
            Err(IntoTupleNameError::UnrepresentableStr)
        );
    }

    #[test]
    fn reserved() {
        assert_eq!(TupleName::new("."), Err(IntoTupleNameError::Reserved));
        assert_eq!(TupleName::new(".."), Err(IntoTupleNameError::Reserved));
        assert_eq!(
            TupleName::new(HEADER_NAME),
            Err(IntoTupleNameError::Reserved)
        );
    }

    #[test]
    fn normalization() {
        let decomposed = TupleName::new("e\u{301}ve\u{300}nements").unwrap();
        let composed = TupleName::new("\u{e9}v\u{e8}nements").unwrap();
        assert_eq!(decomposed, composed);
    }

    #[test]
    fn icecube_emoji() {
        let name = TupleName::new("🧊");
        assert_eq!(name.unwrap().as_str(), "🧊");
    }
}

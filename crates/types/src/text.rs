use crate::TextError;

/// A string type that guarantees non-empty content.
///
/// Used for patient display names and counter titles. Input is trimmed and runs of internal
/// whitespace are collapsed to a single space, so "  Mary   Jones " is stored as "Mary Jones".
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NonEmptyText(String);

impl NonEmptyText {
    /// Creates a new `NonEmptyText`.
    ///
    /// # Errors
    ///
    /// Returns [`TextError::Empty`] if the input is empty or whitespace only.
    pub fn new(input: impl AsRef<str>) -> Result<Self, TextError> {
        let collapsed = input
            .as_ref()
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ");
        if collapsed.is_empty() {
            return Err(TextError::Empty);
        }
        Ok(Self(collapsed))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Iterates the whitespace-separated words.
    pub fn words(&self) -> impl Iterator<Item = &str> {
        self.0.split(' ')
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl std::fmt::Display for NonEmptyText {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for NonEmptyText {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for NonEmptyText {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for NonEmptyText {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        NonEmptyText::new(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trims_and_collapses_whitespace() {
        let text = NonEmptyText::new("  Mary \t  Jones \n").expect("non-empty");
        assert_eq!(text.as_str(), "Mary Jones");
        assert_eq!(text.words().collect::<Vec<_>>(), vec!["Mary", "Jones"]);
    }

    #[test]
    fn rejects_blank_input() {
        assert!(matches!(NonEmptyText::new("   "), Err(TextError::Empty)));
        assert!(matches!(NonEmptyText::new(""), Err(TextError::Empty)));
    }

    #[test]
    fn deserialize_validates() {
        let ok: NonEmptyText = serde_json::from_str("\" Pharmacy \"").expect("valid");
        assert_eq!(ok.as_str(), "Pharmacy");
        assert!(serde_json::from_str::<NonEmptyText>("\"  \"").is_err());
    }
}

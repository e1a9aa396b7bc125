use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString, IntoEnumIterator};

/// Models offered in the selector. The string form is the provider's model id.
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    AsRefStr,
    Display,
    EnumIter,
    EnumString,
)]
pub enum Model {
    #[default]
    #[strum(serialize = "llama3-8b-8192")]
    #[serde(rename = "llama3-8b-8192")]
    Llama3_8b8192,
    #[strum(serialize = "gemma2-9b-it")]
    #[serde(rename = "gemma2-9b-it")]
    Gemma2_9bIt,
}

impl Model {
    pub fn id(&self) -> &str {
        self.as_ref()
    }

    pub fn all() -> Vec<Model> {
        Model::iter().collect()
    }

    // Selector wraps around in both directions.
    pub fn next(self) -> Model {
        let all = Self::all();
        let pos = all.iter().position(|m| *m == self).unwrap_or(0);
        all[(pos + 1) % all.len()]
    }

    pub fn prev(self) -> Model {
        let all = Self::all();
        let pos = all.iter().position(|m| *m == self).unwrap_or(0);
        all[(pos + all.len() - 1) % all.len()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn ids_match_provider_names() {
        assert_eq!(Model::Llama3_8b8192.id(), "llama3-8b-8192");
        assert_eq!(Model::Gemma2_9bIt.to_string(), "gemma2-9b-it");
        assert_eq!(Model::from_str("gemma2-9b-it").unwrap(), Model::Gemma2_9bIt);
        assert!(Model::from_str("gpt-5").is_err());
    }

    #[test]
    fn default_is_first_option() {
        assert_eq!(Model::default(), Model::all()[0]);
    }

    #[test]
    fn selector_wraps() {
        let m = Model::Llama3_8b8192;
        assert_eq!(m.next(), Model::Gemma2_9bIt);
        assert_eq!(m.next().next(), m);
        assert_eq!(m.prev(), Model::Gemma2_9bIt);
    }
}

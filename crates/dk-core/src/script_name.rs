//! Script identity.

use crate::newtype_string::define_newtype_string;

define_newtype_string! {
    /// File name of a change script, extension included.
    ///
    /// Unique within one phase directory and used as the ledger identity.
    /// Scripts are applied in byte-wise order of this name, so `B.js` runs
    /// before `a.js` and `010.js` before `2.js`.
    pub struct ScriptName;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    #[test]
    fn test_try_new_rejects_empty() {
        assert!(ScriptName::try_new("").is_none());
        assert_eq!(ScriptName::try_new("001.js").unwrap(), "001.js");
    }

    #[test]
    fn test_ordering_is_bytewise() {
        let names: BTreeSet<ScriptName> = ["b.js", "B.js", "010.js", "2.js"]
            .into_iter()
            .map(ScriptName::new)
            .collect();
        let ordered: Vec<&str> = names.iter().map(|n| n.as_str()).collect();
        assert_eq!(ordered, vec!["010.js", "2.js", "B.js", "b.js"]);
    }

    #[test]
    fn test_applied_set_lookup_by_str() {
        let mut set = BTreeSet::new();
        set.insert(ScriptName::new("001-init.js"));
        assert!(set.contains("001-init.js"));
    }

    #[test]
    fn test_deserialize_rejects_empty_name() {
        let name: ScriptName = serde_json::from_str("\"001.js\"").unwrap();
        assert_eq!(name, "001.js");

        let err = serde_json::from_str::<ScriptName>("\"\"").unwrap_err();
        assert!(err.to_string().contains("ScriptName cannot be empty"));
    }
}

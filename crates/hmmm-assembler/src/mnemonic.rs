//! Mnemonic resolution onto the core instruction set.
//!
//! Source programs may use either the descriptor names or one of the
//! shorthand spellings. Which spellings are accepted, and what they mean,
//! depends on the [`Dialect`].

use hmmm_core::Mnemonic;

/// Alias table selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Dialect {
    /// Descriptor names map to themselves; shorthands that do not clash
    /// with them are accepted too.
    #[default]
    Canonical,
    /// The 2012 naming, where `loadn`, `load`, `store` and `jump` name the
    /// direct and register-indirect forms and `data` is unavailable.
    Legacy2012,
}

const CANONICAL_SHORTHANDS: &[(&str, Mnemonic)] = &[
    ("setn", Mnemonic::Loadn),
    ("copy", Mnemonic::Mov),
    ("jumpn", Mnemonic::Jump),
    ("calln", Mnemonic::Call),
    ("jeqzn", Mnemonic::Jeqz),
    ("jnezn", Mnemonic::Jnez),
    ("jgtzn", Mnemonic::Jgtz),
    ("jltzn", Mnemonic::Jltz),
    ("jumpr", Mnemonic::Jumpi),
    ("loadr", Mnemonic::Loadi),
    ("storer", Mnemonic::Storei),
    ("storen", Mnemonic::Store),
];

const LEGACY_2012: &[(&str, Mnemonic)] = &[
    ("halt", Mnemonic::Halt),
    ("read", Mnemonic::Read),
    ("write", Mnemonic::Write),
    ("nop", Mnemonic::Nop),
    ("setn", Mnemonic::Loadn),
    ("addn", Mnemonic::Addn),
    ("mov", Mnemonic::Mov),
    ("copy", Mnemonic::Mov),
    ("add", Mnemonic::Add),
    ("sub", Mnemonic::Sub),
    ("neg", Mnemonic::Neg),
    ("mul", Mnemonic::Mul),
    ("div", Mnemonic::Div),
    ("mod", Mnemonic::Mod),
    ("jumpn", Mnemonic::Jump),
    ("jeqz", Mnemonic::Jeqz),
    ("jeqzn", Mnemonic::Jeqz),
    ("jnez", Mnemonic::Jnez),
    ("jnezn", Mnemonic::Jnez),
    ("jgtz", Mnemonic::Jgtz),
    ("jgtzn", Mnemonic::Jgtz),
    ("jltz", Mnemonic::Jltz),
    ("jltzn", Mnemonic::Jltz),
    ("call", Mnemonic::Call),
    ("calln", Mnemonic::Call),
    ("jump", Mnemonic::Jumpi),
    ("jumpr", Mnemonic::Jumpi),
    ("loadn", Mnemonic::Load),
    ("storen", Mnemonic::Store),
    ("load", Mnemonic::Loadi),
    ("loadi", Mnemonic::Loadi),
    ("loadr", Mnemonic::Loadi),
    ("store", Mnemonic::Storei),
    ("storei", Mnemonic::Storei),
    ("storer", Mnemonic::Storei),
];

impl Dialect {
    /// Resolves a source mnemonic; `None` if the dialect does not know it.
    #[must_use]
    pub fn resolve(self, name: &str) -> Option<Mnemonic> {
        match self {
            Self::Canonical => name
                .parse::<Mnemonic>()
                .ok()
                .or_else(|| lookup(CANONICAL_SHORTHANDS, name)),
            Self::Legacy2012 => lookup(LEGACY_2012, name),
        }
    }

    /// Every spelling accepted by this dialect.
    #[must_use]
    pub fn spellings(self) -> Vec<&'static str> {
        match self {
            Self::Canonical => Mnemonic::ALL
                .iter()
                .map(|m| m.name())
                .chain(CANONICAL_SHORTHANDS.iter().map(|(name, _)| *name))
                .collect(),
            Self::Legacy2012 => LEGACY_2012.iter().map(|(name, _)| *name).collect(),
        }
    }
}

fn lookup(table: &[(&str, Mnemonic)], name: &str) -> Option<Mnemonic> {
    table
        .iter()
        .find(|(alias, _)| *alias == name)
        .map(|(_, mnemonic)| *mnemonic)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("loadn", Mnemonic::Loadn)]
    #[case("setn", Mnemonic::Loadn)]
    #[case("copy", Mnemonic::Mov)]
    #[case("jump", Mnemonic::Jump)]
    #[case("jumpr", Mnemonic::Jumpi)]
    #[case("data", Mnemonic::Data)]
    #[case("storen", Mnemonic::Store)]
    fn canonical_names(#[case] name: &str, #[case] expected: Mnemonic) {
        assert_eq!(Dialect::Canonical.resolve(name), Some(expected));
    }

    #[rstest]
    #[case("loadn", Mnemonic::Load)]
    #[case("load", Mnemonic::Loadi)]
    #[case("store", Mnemonic::Storei)]
    #[case("jump", Mnemonic::Jumpi)]
    #[case("jumpn", Mnemonic::Jump)]
    #[case("setn", Mnemonic::Loadn)]
    fn legacy_names_shift_meaning(#[case] name: &str, #[case] expected: Mnemonic) {
        assert_eq!(Dialect::Legacy2012.resolve(name), Some(expected));
    }

    #[test]
    fn unknown_names_do_not_resolve() {
        assert_eq!(Dialect::Canonical.resolve("frob"), None);
        assert_eq!(Dialect::Legacy2012.resolve("data"), None);
        assert_eq!(Dialect::Canonical.resolve("ADD"), None);
    }

    #[test]
    fn every_descriptor_name_is_canonical() {
        for mnemonic in Mnemonic::ALL {
            assert_eq!(Dialect::Canonical.resolve(mnemonic.name()), Some(mnemonic));
        }
    }

    #[test]
    fn every_spelling_resolves() {
        for dialect in [Dialect::Canonical, Dialect::Legacy2012] {
            for name in dialect.spellings() {
                assert!(dialect.resolve(name).is_some(), "{name}");
            }
        }
    }
}

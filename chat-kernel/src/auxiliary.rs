//! Registry of auxiliary capabilities reachable through `/name` commands.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use chat_adapters::AuxiliaryCapability;

use crate::error::{TurnError, TurnResult};

/// A parsed `/name [argument]` command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Command<'a> {
    /// Capability name, without the slash.
    pub name: &'a str,
    /// Trimmed argument, if any.
    pub argument: Option<&'a str>,
}

impl<'a> Command<'a> {
    /// Parses `input` as a command. Returns `None` for ordinary text.
    #[must_use]
    pub fn parse(input: &'a str) -> Option<Self> {
        let rest = input.trim().strip_prefix('/')?;
        let (name, argument) = match rest.split_once(char::is_whitespace) {
            Some((name, argument)) => (name, Some(argument.trim())),
            None => (rest, None),
        };
        if name.is_empty() {
            return None;
        }
        Some(Self {
            name,
            argument: argument.filter(|argument| !argument.is_empty()),
        })
    }
}

/// Named auxiliary capabilities.
#[derive(Clone, Default)]
pub struct AuxiliaryRegistry {
    capabilities: BTreeMap<String, Arc<dyn AuxiliaryCapability>>,
}

impl fmt::Debug for AuxiliaryRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuxiliaryRegistry")
            .field("registered", &self.capabilities.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl AuxiliaryRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a capability under its own name.
    ///
    /// # Errors
    ///
    /// Returns [`TurnError::Setup`] if the name is blank, contains whitespace,
    /// or is already taken.
    pub fn register(&mut self, capability: Arc<dyn AuxiliaryCapability>) -> TurnResult<()> {
        let name = capability.name().to_owned();
        if name.is_empty() || name.contains(char::is_whitespace) {
            return Err(TurnError::setup(format!("invalid capability name `{name}`")));
        }
        if self.capabilities.contains_key(&name) {
            return Err(TurnError::setup(format!(
                "capability `{name}` is already registered"
            )));
        }
        self.capabilities.insert(name, capability);
        Ok(())
    }

    /// Looks up a capability by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Arc<dyn AuxiliaryCapability>> {
        self.capabilities.get(name)
    }

    /// Resolves `input` to a registered capability and its argument.
    ///
    /// Commands naming an unregistered capability resolve to `None` and are
    /// treated as ordinary text.
    #[must_use]
    pub fn resolve<'a>(
        &self,
        input: &'a str,
    ) -> Option<(&Arc<dyn AuxiliaryCapability>, Command<'a>)> {
        let command = Command::parse(input)?;
        self.get(command.name).map(|capability| (capability, command))
    }

    /// `(name, description)` pairs in name order.
    #[must_use]
    pub fn describe(&self) -> Vec<(&str, &str)> {
        self.capabilities
            .iter()
            .map(|(name, capability)| (name.as_str(), capability.description()))
            .collect()
    }

    /// Whether no capability is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.capabilities.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use chat_adapters::AdapterResult;

    use super::*;

    struct Echo;

    #[async_trait]
    impl AuxiliaryCapability for Echo {
        fn name(&self) -> &str {
            "echo"
        }

        fn description(&self) -> &str {
            "repeat the argument"
        }

        async fn invoke(&self, input: Option<&str>) -> AdapterResult<String> {
            Ok(input.unwrap_or_default().to_owned())
        }
    }

    #[test]
    fn commands_parse() {
        assert_eq!(
            Command::parse("  /search   rust lang "),
            Some(Command {
                name: "search",
                argument: Some("rust lang")
            })
        );
        assert_eq!(
            Command::parse("/time"),
            Some(Command {
                name: "time",
                argument: None
            })
        );
        assert_eq!(Command::parse("/"), None);
        assert_eq!(Command::parse("what is 1/2"), None);
    }

    #[test]
    fn duplicates_are_rejected() {
        let mut registry = AuxiliaryRegistry::new();
        registry.register(Arc::new(Echo)).unwrap();
        assert!(matches!(
            registry.register(Arc::new(Echo)),
            Err(TurnError::Setup { .. })
        ));
        assert_eq!(registry.describe(), vec![("echo", "repeat the argument")]);
    }

    #[test]
    fn unknown_commands_are_plain_text() {
        let mut registry = AuxiliaryRegistry::new();
        registry.register(Arc::new(Echo)).unwrap();
        assert!(registry.resolve("/weather paris").is_none());
        let (capability, command) = registry.resolve("/echo hi").unwrap();
        assert_eq!(capability.name(), "echo");
        assert_eq!(command.argument, Some("hi"));
    }
}

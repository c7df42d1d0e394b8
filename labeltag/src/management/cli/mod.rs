// This file is part of the product NoPressure.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

pub mod categories;
pub mod mappings;
pub(crate) mod parse_utils;

use crate::management::cli_helper::CliCommand;
use std::collections::BTreeSet;
use std::fmt::{self, Write};
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CliErrorKind {
    Usage,
    Connector,
}

#[derive(Debug, Clone)]
pub struct CliError {
    kind: CliErrorKind,
    message: String,
}

impl CliError {
    pub fn usage(message: impl Into<String>) -> Self {
        Self {
            kind: CliErrorKind::Usage,
            message: message.into(),
        }
    }

    pub fn connector(message: impl Into<String>) -> Self {
        Self {
            kind: CliErrorKind::Connector,
            message: message.into(),
        }
    }

    pub fn exit_code(&self) -> i32 {
        match self.kind {
            CliErrorKind::Usage => 2,
            CliErrorKind::Connector => 1,
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

/// Something the command line can name: a domain or a command within one.
trait Named {
    fn name(&self) -> &'static str;
    fn aliases(&self) -> &'static [&'static str];

    fn names(&self) -> impl Iterator<Item = &'static str> {
        std::iter::once(self.name()).chain(self.aliases().iter().copied())
    }

    fn is_exactly(&self, token: &str) -> bool {
        self.names().any(|name| name.eq_ignore_ascii_case(token))
    }

    fn starts_with(&self, token: &str) -> bool {
        self.names()
            .any(|name| name.to_ascii_lowercase().starts_with(token))
    }
}

pub struct DomainSpec {
    pub name: &'static str,
    pub aliases: &'static [&'static str],
    pub commands: Vec<CommandSpec>,
}

impl Named for DomainSpec {
    fn name(&self) -> &'static str {
        self.name
    }

    fn aliases(&self) -> &'static [&'static str] {
        self.aliases
    }
}

pub struct CommandSpec {
    pub name: &'static str,
    pub aliases: &'static [&'static str],
    pub usage: &'static [&'static str],
    pub parser: fn(&[String]) -> Result<CliCommand, CliError>,
}

impl Named for CommandSpec {
    fn name(&self) -> &'static str {
        self.name
    }

    fn aliases(&self) -> &'static [&'static str] {
        self.aliases
    }
}

/// Records every name of `item` in `taken`, failing on the first clash.
fn claim_names(
    taken: &mut BTreeSet<String>,
    item: &impl Named,
    what: &str,
    scope: &str,
) -> Result<(), CliError> {
    for name in item.names() {
        if !taken.insert(name.to_ascii_lowercase()) {
            return Err(CliError::usage(format!(
                "Duplicate {} name or alias '{}'{}",
                what, name, scope
            )));
        }
    }
    Ok(())
}

#[derive(Default)]
pub struct CliRegistry {
    domains: Vec<DomainSpec>,
    domain_names: BTreeSet<String>,
}

impl CliRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_domain(&mut self, domain: DomainSpec) -> Result<(), CliError> {
        let mut command_names = BTreeSet::new();
        let scope = format!(" in domain '{}'", domain.name);
        for command in &domain.commands {
            claim_names(&mut command_names, command, "command", &scope)?;
        }
        claim_names(&mut self.domain_names, &domain, "domain", "")?;
        self.domains.push(domain);
        Ok(())
    }

    /// Resolves `<domain> <command> [args]` and runs the command's argument parser.
    pub fn resolve_command(&self, tokens: &[String]) -> Result<CliCommand, CliError> {
        let (domain_token, rest) = tokens
            .split_first()
            .ok_or_else(|| CliError::usage("Missing command domain"))?;
        let domain = resolve(domain_token, &self.domains, "domain")?;
        let (command_token, args) = rest.split_first().ok_or_else(|| {
            CliError::usage(format!("Missing command for domain '{}'", domain.name))
        })?;
        let command = resolve(command_token, &domain.commands, "command")?;
        (command.parser)(args)
    }
}

/// Exact names and aliases win; otherwise a prefix must pick out exactly one item.
fn resolve<'a, T: Named>(token: &str, items: &'a [T], what: &str) -> Result<&'a T, CliError> {
    if let Some(item) = items.iter().find(|item| item.is_exactly(token)) {
        return Ok(item);
    }
    let token_lower = token.to_ascii_lowercase();
    let matched: Vec<&T> = items
        .iter()
        .filter(|item| item.starts_with(&token_lower))
        .collect();
    match matched.as_slice() {
        [item] => Ok(*item),
        [] => Err(CliError::usage(format!("Unknown {} '{}'", what, token))),
        _ => {
            let mut names: Vec<&str> = matched.iter().map(|item| item.name()).collect();
            names.sort_unstable();
            Err(CliError::usage(format!(
                "Ambiguous {} prefix '{}': {}",
                what,
                token,
                names.join(", ")
            )))
        }
    }
}

pub fn build_registry() -> Result<CliRegistry, CliError> {
    let mut registry = CliRegistry::new();
    registry.register_domain(mappings::domain())?;
    registry.register_domain(categories::domain())?;
    Ok(registry)
}

const HELP_HEADER: &str = "\
Usage:
  labeltag [options] [serve]
  labeltag [options] <domain> <command> [args]
  labeltag help

Options:
  -C <root>   Set the runtime root (default: .).
  -h, --help  Show this help.

Domains and commands:
";

const HELP_NOTES: &str = "\
Notes:
  Domains and commands are case-insensitive and accept unambiguous prefixes.
  An empty --entity selects the default entity; _all_entities_ maps every entity.
";

fn with_aliases(item: &impl Named) -> String {
    match item.aliases() {
        [] => item.name().to_string(),
        aliases => format!("{} (aliases: {})", item.name(), aliases.join(", ")),
    }
}

pub fn help_text() -> String {
    let registry = match build_registry() {
        Ok(registry) => registry,
        Err(err) => return format!("Failed to build CLI registry: {}", err),
    };

    let mut out = String::from(HELP_HEADER);
    for domain in &registry.domains {
        let _ = writeln!(out, "  {}", with_aliases(domain));
        for command in &domain.commands {
            let _ = writeln!(out, "    {}", with_aliases(command));
            for usage in command.usage {
                let _ = writeln!(out, "      {}", usage);
            }
        }
    }
    out.push('\n');
    out.push_str(HELP_NOTES);
    out
}

pub async fn run_cli(runtime_root: &Path, tokens: Vec<String>) -> i32 {
    let outcome = match build_registry().and_then(|registry| registry.resolve_command(&tokens)) {
        Ok(command) => crate::management::cli_helper::execute(runtime_root, command).await,
        Err(err) => Err(err),
    };
    match outcome {
        Ok(exit_code) => exit_code,
        Err(err) => {
            eprintln!("{}", err);
            err.exit_code()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn never(_args: &[String]) -> Result<CliCommand, CliError> {
        Err(CliError::usage("parser reached"))
    }

    fn command(name: &'static str, aliases: &'static [&'static str]) -> CommandSpec {
        CommandSpec {
            name,
            aliases,
            usage: &[],
            parser: never,
        }
    }

    fn tokens(values: &[&str]) -> Vec<String> {
        values.iter().map(|value| value.to_string()).collect()
    }

    fn label_registry() -> CliRegistry {
        let mut registry = CliRegistry::new();
        registry
            .register_domain(DomainSpec {
                name: "label",
                aliases: &["l"],
                commands: vec![
                    command("create", &["c"]),
                    command("list", &[]),
                    command("link", &[]),
                ],
            })
            .unwrap();
        registry
    }

    fn resolve_err(registry: &CliRegistry, values: &[&str]) -> String {
        match registry.resolve_command(&tokens(values)) {
            Err(err) => err.to_string(),
            Ok(_) => panic!("expected resolution to fail"),
        }
    }

    #[test]
    fn prefixes_and_aliases_reach_the_parser() {
        let registry = label_registry();
        assert_eq!(resolve_err(&registry, &["LA", "cre"]), "parser reached");
        assert_eq!(resolve_err(&registry, &["l", "C"]), "parser reached");
    }

    #[test]
    fn ambiguous_prefix_names_the_candidates() {
        let registry = label_registry();
        assert_eq!(
            resolve_err(&registry, &["label", "li"]),
            "Ambiguous command prefix 'li': link, list"
        );
    }

    #[test]
    fn missing_and_unknown_tokens_are_usage_errors() {
        let registry = label_registry();
        assert_eq!(resolve_err(&registry, &[]), "Missing command domain");
        assert_eq!(
            resolve_err(&registry, &["label"]),
            "Missing command for domain 'label'"
        );
        assert_eq!(resolve_err(&registry, &["zone", "create"]), "Unknown domain 'zone'");
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let mut registry = label_registry();
        let err = registry
            .register_domain(DomainSpec {
                name: "beta",
                aliases: &["L"],
                commands: Vec::new(),
            })
            .unwrap_err();
        assert_eq!(err.exit_code(), 2);

        let err = CliRegistry::new()
            .register_domain(DomainSpec {
                name: "gamma",
                aliases: &[],
                commands: vec![command("show", &[]), command("view", &["show"])],
            })
            .unwrap_err();
        assert!(err.to_string().contains("in domain 'gamma'"));
    }

    #[test]
    fn help_lists_both_domains() {
        let text = help_text();
        assert!(text.starts_with("Usage:"));
        assert!(text.contains("  mapping (aliases: m)"));
        assert!(text.contains("  category (aliases: c)"));
        assert!(text.contains("entry-add"));
        assert!(text.ends_with("maps every entity.\n"));
    }
}

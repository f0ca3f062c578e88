//! Placeholder substitution for command templates

use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;
use uuid::Uuid;

use crate::catalog::Catalog;
use crate::error::{CatalogError, CatalogResult};
use crate::models::{Phase, ResolvedCommand};

/// A recognised template token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placeholder {
    Domain,
    IpRange,
    Ports,
    Filename,
}

impl Placeholder {
    pub const ALL: [Placeholder; 4] = [
        Placeholder::Domain,
        Placeholder::IpRange,
        Placeholder::Ports,
        Placeholder::Filename,
    ];

    /// Literal token as written in templates
    pub fn token(&self) -> &'static str {
        match self {
            Placeholder::Domain => "{domain}",
            Placeholder::IpRange => "{ip/range}",
            Placeholder::Ports => "{ports}",
            Placeholder::Filename => "{filename}",
        }
    }
}

impl fmt::Display for Placeholder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

/// Values typed by the user for each placeholder
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratorInputs {
    #[serde(default)]
    pub domain: String,
    #[serde(default)]
    pub ip_range: String,
    #[serde(default)]
    pub ports: String,
    #[serde(default)]
    pub filename: String,
}

impl GeneratorInputs {
    pub fn get(&self, placeholder: Placeholder) -> &str {
        match placeholder {
            Placeholder::Domain => &self.domain,
            Placeholder::IpRange => &self.ip_range,
            Placeholder::Ports => &self.ports,
            Placeholder::Filename => &self.filename,
        }
    }

    pub fn set(&mut self, placeholder: Placeholder, value: impl Into<String>) {
        let slot = match placeholder {
            Placeholder::Domain => &mut self.domain,
            Placeholder::IpRange => &mut self.ip_range,
            Placeholder::Ports => &mut self.ports,
            Placeholder::Filename => &mut self.filename,
        };
        *slot = value.into();
    }

    /// Trimmed, non-empty values keyed by placeholder
    pub fn values(&self) -> Vec<(Placeholder, &str)> {
        Placeholder::ALL
            .iter()
            .map(|p| (*p, self.get(*p).trim()))
            .filter(|(_, value)| !value.is_empty())
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.values().is_empty()
    }
}

/// Replaces every supplied placeholder; the others stay verbatim
pub fn substitute(template: &str, inputs: &GeneratorInputs) -> String {
    inputs
        .values()
        .into_iter()
        .fold(template.to_string(), |text, (placeholder, value)| {
            text.replace(placeholder.token(), value)
        })
}

fn require_inputs(inputs: &GeneratorInputs) -> CatalogResult<()> {
    if inputs.is_empty() {
        return Err(CatalogError::validation(
            "Please enter at least one value (domain, IP range, ports or filename)",
        ));
    }
    Ok(())
}

/// Substitutes a single template, failing when no input was supplied
pub fn generate(template: &str, inputs: &GeneratorInputs) -> CatalogResult<String> {
    require_inputs(inputs)?;
    Ok(substitute(template, inputs))
}

/// A command paired with its substituted text
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedCommand {
    #[serde(flatten)]
    pub command: ResolvedCommand,
    pub generated_command: String,
}

/// Generates text for the commands shown in a view
///
/// Only commands whose category type is `active_type` are substituted; the
/// rest keep their template.
pub fn generate_for_view(
    commands: &[ResolvedCommand],
    active_type: &str,
    inputs: &GeneratorInputs,
) -> CatalogResult<Vec<GeneratedCommand>> {
    require_inputs(inputs)?;
    Ok(commands
        .iter()
        .map(|command| {
            let generated_command = if command.category_type() == Some(active_type) {
                substitute(&command.command, inputs)
            } else {
                command.command.clone()
            };
            GeneratedCommand {
                command: command.clone(),
                generated_command,
            }
        })
        .collect())
}

/// Body of a generate request
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRequest {
    #[serde(flatten)]
    pub inputs: GeneratorInputs,
    #[serde(default)]
    pub category_id: Option<Uuid>,
    #[serde(default)]
    pub phase: Option<Phase>,
}

impl Catalog {
    /// Substitutes the inputs into every command matching the filters
    pub fn generate(&self, request: &GenerateRequest) -> CatalogResult<Vec<GeneratedCommand>> {
        require_inputs(&request.inputs)?;
        let commands = self.commands_where(|c| {
            request.category_id.map_or(true, |id| c.category == id)
                && request.phase.map_or(true, |phase| c.phase == phase)
        })?;
        debug!(count = commands.len(), "generating commands");

        Ok(commands
            .into_iter()
            .map(|command| {
                let generated_command = substitute(&command.command, &request.inputs);
                GeneratedCommand {
                    command,
                    generated_command,
                }
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::tests::{memory_catalog, new_category, new_command};
    use crate::error::ErrorKind;
    use crate::models::{category_lookup, Category, Command};

    fn domain(value: &str) -> GeneratorInputs {
        GeneratorInputs {
            domain: value.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_substitute_domain() {
        let text = generate("nmap -sC -sV {domain}", &domain("example.com")).unwrap();
        assert_eq!(text, "nmap -sC -sV example.com");
    }

    #[test]
    fn test_substitute_every_occurrence_and_keeps_unmatched() {
        let inputs = GeneratorInputs {
            domain: " target.local ".to_string(),
            ports: "80,443".to_string(),
            ..Default::default()
        };
        let text = substitute("x {domain} -p {ports} {domain} -oN {filename}", &inputs);
        assert_eq!(text, "x target.local -p 80,443 target.local -oN {filename}");
    }

    #[test]
    fn test_ip_range_token() {
        let mut inputs = GeneratorInputs::default();
        inputs.set(Placeholder::IpRange, "10.0.0.0/24");
        assert_eq!(substitute("masscan {ip/range}", &inputs), "masscan 10.0.0.0/24");
    }

    #[test]
    fn test_all_empty_inputs_rejected() {
        let inputs = GeneratorInputs {
            domain: "   ".to_string(),
            ..Default::default()
        };
        let err = generate("nmap {domain}", &inputs).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BadRequest);
    }

    #[test]
    fn test_generate_for_view_only_touches_active_type() {
        let web = Category::new("Web".to_string(), "Web Application".to_string());
        let net = Category::new("Net".to_string(), "Network".to_string());
        let lookup = category_lookup(&[web.clone(), net.clone()]);
        let commands = vec![
            ResolvedCommand::resolve(
                Command::new("a".into(), "curl {domain}".into(), web.id, Phase::Scanning),
                &lookup,
            ),
            ResolvedCommand::resolve(
                Command::new("b".into(), "ping {domain}".into(), net.id, Phase::Scanning),
                &lookup,
            ),
        ];

        let generated =
            generate_for_view(&commands, "Web Application", &domain("example.com")).unwrap();
        assert_eq!(generated[0].generated_command, "curl example.com");
        assert_eq!(generated[1].generated_command, "ping {domain}");
    }

    #[test]
    fn test_catalog_generate_filters() {
        let catalog = memory_catalog();
        let web = catalog.create_category(new_category("Web", "Web")).unwrap();
        catalog
            .create_command(new_command("Nikto", web.id, Phase::Scanning))
            .unwrap();
        catalog
            .create_command(new_command("Whois", web.id, Phase::Reconnaissance))
            .unwrap();

        let request = GenerateRequest {
            inputs: domain("example.com"),
            category_id: Some(web.id),
            phase: Some(Phase::Scanning),
        };
        let generated = catalog.generate(&request).unwrap();
        assert_eq!(generated.len(), 1);
        assert_eq!(generated[0].generated_command, "nikto example.com");

        let value = serde_json::to_value(&generated[0]).unwrap();
        assert_eq!(value["generatedCommand"], "nikto example.com");
        assert_eq!(value["name"], "Nikto");
    }

    #[test]
    fn test_catalog_generate_requires_input() {
        let catalog = memory_catalog();
        let err = catalog.generate(&GenerateRequest::default()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BadRequest);
    }
}

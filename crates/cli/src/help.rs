//! Top-level help with commands grouped into sections
//!
//! The registry must list exactly the subcommands `Cli` defines; a test
//! checks the two against each other.

use std::collections::BTreeMap;

/// Sections of the top-level help, in display order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Category {
    Data,
    Diagnostics,
    Configure,
}

impl Category {
    pub fn heading(&self) -> &'static str {
        match self {
            Category::Data => "Data",
            Category::Diagnostics => "Diagnostics",
            Category::Configure => "Configure",
        }
    }
}

#[derive(Debug, Clone)]
pub struct CommandInfo {
    pub name: &'static str,
    pub description: &'static str,
    pub category: Category,
}

pub fn command_registry() -> Vec<CommandInfo> {
    vec![
        CommandInfo {
            name: "object",
            description: "Get, post and copy ISS objects",
            category: Category::Data,
        },
        CommandInfo {
            name: "calc",
            description: "Submit, run and inspect calculations",
            category: Category::Data,
        },
        CommandInfo {
            name: "diff",
            description: "Compare objects or calculations",
            category: Category::Data,
        },
        CommandInfo {
            name: "introspect",
            description: "Show what the server is working on",
            category: Category::Diagnostics,
        },
        CommandInfo {
            name: "echo",
            description: "Round-trip a message through the server",
            category: Category::Diagnostics,
        },
        CommandInfo {
            name: "config",
            description: "Settings",
            category: Category::Configure,
        },
    ]
}

pub fn generate_help() -> String {
    let mut output = String::new();

    output.push_str("cradle - client for the cradle computation service\n\n");
    output.push_str("Usage: cradle <command> [options]\n\n");

    let commands = command_registry();
    let mut by_category: BTreeMap<Category, Vec<&CommandInfo>> = BTreeMap::new();
    for cmd in &commands {
        by_category.entry(cmd.category).or_default().push(cmd);
    }

    for (category, cmds) in by_category {
        output.push_str(category.heading());
        output.push_str(":\n");

        let width = cmds.iter().map(|c| c.name.len()).max().unwrap_or(0) + 2;
        for cmd in cmds {
            output.push_str(&format!("  {:<width$}{}\n", cmd.name, cmd.description));
        }
        output.push('\n');
    }

    output.push_str("Run 'cradle <command> --help' for more information on a command.\n");
    output
}

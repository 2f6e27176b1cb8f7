//! Colored terminal rendering of the shell's structured output.
//!
//! Every function returns a `String` so the caller decides where it goes.
//! Boxes open with `╭───`, continue with `│` and close with a `•`.

use colored::{Color, ColoredString, Colorize};
use drivecord_kernel::{
    CommandDoc, EntryType, ListItem, ListView, Output, Prompt, TreeView, format_size,
};
use drivecord_types::{Instance, Rank, TraceHop};

const PRIMARY: Color = Color::TrueColor {
    r: 183,
    g: 170,
    b: 224,
};
const ERROR: Color = Color::TrueColor {
    r: 247,
    g: 119,
    b: 149,
};

fn primary(text: &str) -> ColoredString {
    text.color(PRIMARY)
}

fn frame(text: &str) -> ColoredString {
    text.bright_black()
}

fn rank_color(rank: Rank) -> Color {
    match rank {
        Rank::Owner => Color::Magenta,
        Rank::Admin => Color::Red,
        Rank::Write => Color::Yellow,
        Rank::Read => Color::Blue,
    }
}

fn close() -> String {
    format!("│\n{}\n", primary("•"))
}

/// Render one output block.
pub fn output(output: &Output) -> String {
    match output {
        Output::Success { message } => format!("{} {}", "✓".green(), message.italic()),
        Output::Error { message } => {
            format!("{} {}", "×".red(), message.color(ERROR).italic())
        }
        Output::Warning { message } => format!("{} {}", "!".yellow().bold(), message.italic()),
        Output::Info { message } => format!("{} {message}", primary("•")),
        Output::Tree(view) => tree(view),
        Output::List(view) => list(view),
        Output::CommandHelp(doc) => command_help(doc),
        Output::FileContent { name, text } => file_content(name, text),
        Output::Trace { hops } => trace(hops),
    }
}

/// `• (drive) ~/docs/ :: `, the dot colored by rank.
pub fn prompt(prompt: &Prompt) -> String {
    format!(
        "\n{} {}{}{} {} {} ",
        "•".color(rank_color(prompt.rank)),
        "(".dimmed(),
        primary(&prompt.instance).italic(),
        ")".dimmed(),
        prompt.cwd.italic(),
        primary("::"),
    )
}

/// Startup banner.
pub fn banner(title: &str) -> String {
    let width = title.chars().count() + 4;
    let rule = "─".repeat(width);
    format!(
        "\n╭{rule}╮\n│{blank}│\n│  {}  │\n│{blank}│\n╰{rule}╯\n",
        primary(title).bold().italic(),
        blank = " ".repeat(width),
    )
}

/// Numbered menu of drives for the selection question.
pub fn instance_menu(candidates: &[Instance]) -> String {
    let mut out = format!(
        "\n╭───{} {} {}\n│\n",
        frame("[ ?"),
        primary("Select a drive instance").bold().italic(),
        frame("]")
    );
    for (index, instance) in candidates.iter().enumerate() {
        out.push_str(&format!(
            "│  {} {} {}\n",
            primary(&format!("{}.", index + 1)).italic(),
            instance.name,
            frame(&format!("({})", instance.id)),
        ));
    }
    out.push('│');
    out
}

// ============================================================================
// Tree
// ============================================================================

fn tree(view: &TreeView) -> String {
    let mut out = format!("\n╭───{} {} {}\n│\n", frame("<"), view.root, frame(">"));
    let dir_icon = if view.recursive { "📂" } else { "📁" };

    for entry in &view.entries {
        let size = frame(&format!("({})", format_size(entry.size))).italic();
        let line = match entry.kind {
            EntryType::File => format!(
                "│ {}📄 {}  {size}",
                level_lines(entry.depth),
                entry.name
            ),
            EntryType::Directory => {
                let branch = match entry.depth {
                    0 => String::new(),
                    depth => {
                        let glyph = if entry.last { "╰─" } else { "├─" };
                        format!("{}{}", level_lines(depth - 1), frame(glyph))
                    }
                };
                format!("│ {branch}{dir_icon} {}  {size}", entry.name.cyan())
            }
        };
        out.push_str(&line);
        out.push('\n');
    }
    out.push_str(&close());
    out
}

fn level_lines(depth: usize) -> String {
    frame("│ ").to_string().repeat(depth)
}

// ============================================================================
// Lists and help
// ============================================================================

fn list(view: &ListView) -> String {
    let mut out = format!("\n╭───{} {} {}\n", frame("("), view.title, frame(")"));
    for group in &view.groups {
        if let Some(label) = &group.label {
            out.push_str(&format!(
                "│\n├ [{}]\n",
                format!(" {label} ").on_bright_black().white()
            ));
        }
        for item in &group.items {
            out.push_str(&format!("│  {} {}\n", "•".dimmed(), list_item(item)));
        }
    }
    out.push_str(&close());
    out
}

fn list_item(item: &ListItem) -> String {
    let mut line = item.label.clone();
    if let Some(rank) = item.rank {
        line.push_str(&format!(
            "{}{}",
            frame("@"),
            rank.as_str().color(rank_color(rank))
        ));
    }
    if let Some(detail) = &item.detail {
        line.push_str(&format!(" {}", detail.italic()));
    }
    if let Some(note) = &item.note {
        line.push_str(&format!(" {} {}", frame("-"), note.dimmed()));
    }
    if item.dimmed {
        line.dimmed().to_string()
    } else {
        line
    }
}

fn command_help(doc: &CommandDoc) -> String {
    let usage = std::iter::once(doc.name.clone())
        .chain(doc.params.iter().map(|p| match &p.default {
            None => format!("<{}: {}>", p.name, p.type_name),
            Some(default) => format!("[{}?: {} = `{default}`]", p.name, p.type_name),
        }))
        .collect::<Vec<_>>()
        .join(" ");
    let aliases = if doc.aliases.is_empty() {
        "-".to_string()
    } else {
        doc.aliases.join(", ")
    };
    let rank = match doc.rank {
        Some(rank) => rank.as_str().color(rank_color(rank)).to_string(),
        None => "-".to_string(),
    };

    let mut out = format!("\n╭───{} {} {}\n", frame("("), primary(&doc.name).bold(), frame(")"));
    out.push_str(&format!("│ Group    : {}\n", doc.group));
    out.push_str(&format!("│ Aliases  : {aliases}\n"));
    out.push_str(&format!("│ Requires : {rank}\n"));
    out.push_str(&format!("│ Usage    : {}\n│\n", usage.italic()));
    for line in doc.docs.lines() {
        out.push_str(&format!("│ {line}\n"));
    }
    out.push_str(&close());
    out
}

// ============================================================================
// Files and traces
// ============================================================================

fn file_content(name: &str, text: &str) -> String {
    let total = text.split('\n').count();
    let width = total.to_string().len();

    let mut out = format!(
        "\nFile : {} {} {}\nSize : {}\nLines: {}\n\n",
        frame("["),
        primary(name),
        frame("]"),
        primary(&format!("{}b", text.len())),
        primary(&total.to_string()),
    );
    for (number, line) in text.split('\n').enumerate() {
        out.push_str(&format!(
            "  {} {}{line}\n",
            primary(&format!("{:<width$}", number + 1)),
            frame("│ "),
        ));
    }
    out
}

fn trace(hops: &[TraceHop]) -> String {
    let mut out = String::from("\n");
    for (index, hop) in hops.iter().enumerate() {
        if index > 0 {
            out.push_str(&"  ".repeat(index));
            out.push_str(&primary("╰> ").to_string());
        }
        out.push_str(&format!("{} ({})\n", hop.id.italic(), hop.url.underline()));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use drivecord_kernel::{ListGroup, TreeEntry};

    fn plain() {
        colored::control::set_override(false);
    }

    fn entry(depth: usize, kind: EntryType, name: &str, size: u64, last: bool) -> TreeEntry {
        TreeEntry {
            depth,
            kind,
            name: name.into(),
            size,
            last,
        }
    }

    #[test]
    fn test_messages() {
        plain();
        assert_eq!(output(&Output::success("Removed: a")), "✓ Removed: a");
        assert_eq!(output(&Output::error("nope")), "× nope");
    }

    #[test]
    fn test_tree_branches() {
        plain();
        let view = TreeView {
            root: "~/".into(),
            recursive: true,
            entries: vec![
                entry(0, EntryType::File, "top.md", 5, false),
                entry(0, EntryType::Directory, "docs", 1536, false),
                entry(1, EntryType::File, "a.txt", 1536, false),
                entry(1, EntryType::Directory, "x", 0, false),
                entry(1, EntryType::Directory, "y", 0, true),
            ],
        };
        let rendered = output(&Output::Tree(view));
        let lines: Vec<_> = rendered.lines().collect();
        assert_eq!(lines[1], "╭───< ~/ >");
        assert_eq!(lines[3], "│ 📄 top.md  (5b)");
        assert_eq!(lines[4], "│ 📂 docs  (1.5Kb)");
        assert_eq!(lines[5], "│ │ 📄 a.txt  (1.5Kb)");
        assert_eq!(lines[6], "│ ├─📂 x  (0b)");
        assert_eq!(lines[7], "│ ╰─📂 y  (0b)");
        assert_eq!(lines.last(), Some(&"•"));
    }

    #[test]
    fn test_list_groups_and_ranks() {
        plain();
        let view = ListView {
            title: "family's members.".into(),
            groups: vec![ListGroup {
                label: Some("Registered: 1".into()),
                items: vec![ListItem::new("amy").with_rank(Some(Rank::Write)).with_detail("12")],
            }],
        };
        let rendered = output(&Output::List(view));
        assert!(rendered.contains("├ [ Registered: 1 ]"));
        assert!(rendered.contains("│  • amy@Write 12"));
    }

    #[test]
    fn test_command_help_usage() {
        plain();
        let doc = CommandDoc {
            name: "ls".into(),
            group: "File system.".into(),
            aliases: vec!["dir".into()],
            params: vec![drivecord_kernel::ParamDoc {
                name: "Recursive".into(),
                type_name: "Boolean".into(),
                default: Some("false".into()),
            }],
            rank: Some(Rank::Read),
            docs: "List.".into(),
        };
        let rendered = output(&Output::CommandHelp(doc));
        assert!(rendered.contains("│ Usage    : ls [Recursive?: Boolean = `false`]"));
        assert!(rendered.contains("│ Requires : Read"));
        assert!(rendered.contains("│ Aliases  : dir"));
    }

    #[test]
    fn test_file_content_numbers_lines() {
        plain();
        let text = (1..=10).map(|n| n.to_string()).collect::<Vec<_>>().join("\n");
        let rendered = output(&Output::FileContent {
            name: "n.txt".into(),
            text,
        });
        assert!(rendered.contains("Lines: 10"));
        assert!(rendered.contains("  1  │ 1\n"));
        assert!(rendered.contains("  10 │ 10\n"));
    }

    #[test]
    fn test_trace_indents() {
        plain();
        let hops = vec![
            TraceHop {
                id: "1".into(),
                url: "u1".into(),
            },
            TraceHop {
                id: "2".into(),
                url: "u2".into(),
            },
        ];
        assert_eq!(output(&Output::Trace { hops }), "\n1 (u1)\n  ╰> 2 (u2)\n");
    }

    #[test]
    fn test_prompt_shape() {
        plain();
        let rendered = prompt(&Prompt {
            rank: Rank::Owner,
            instance: "family".into(),
            cwd: "~/docs/".into(),
        });
        assert_eq!(rendered, "\n• (family) ~/docs/ :: ");
    }
}

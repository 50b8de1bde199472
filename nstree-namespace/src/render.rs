//! Indented text rendering of a namespace forest

use std::fmt::Write;

use nstree_core::{Error, NamespaceId, ProcessId, Result};

use crate::config::RenderOptions;
use crate::forest::NamespaceForest;
use crate::kind::NamespaceKind;

/// Label printed in place of the invisible-ancestor bucket's identity
pub const INVISIBLE_LABEL: &str = "[invisible ancestor user NS]";

/// Characters reserved for one PID in a packed list
const PID_WIDTH: usize = 6;

/// A packed PID line always carries at least this many characters, however
/// deep the indentation
const MIN_DISPLAY_WIDTH: usize = 32;

const LEVEL_INDENT: usize = 4;
const MEMBER_INDENT: usize = 8;

const USERNS_COLOR: &str = "\x1b[93m\x1b[1m";
const PID_COLOR: &str = "\x1b[38;5;51m";
const NORMAL: &str = "\x1b(B\x1b[m";

/// Per-process details shown next to member PIDs
///
/// Each lookup returns `None` when the process has gone away since its
/// namespaces were scanned.
pub trait ProcessInfo {
    /// Command name of the process
    fn command_name(&self, pid: ProcessId) -> Option<String>;

    /// The process's PID in each PID namespace it belongs to, outermost first
    fn namespace_pids(&self, pid: ProcessId) -> Option<Vec<i32>>;
}

/// Renders a finished [`NamespaceForest`] as an indented tree
#[derive(Debug)]
pub struct TreeRenderer<'a, I> {
    forest: &'a NamespaceForest,
    options: &'a RenderOptions,
    info: &'a I,
}

impl<'a, I: ProcessInfo> TreeRenderer<'a, I> {
    /// Create a renderer over `forest`
    #[must_use]
    pub const fn new(forest: &'a NamespaceForest, options: &'a RenderOptions, info: &'a I) -> Self {
        Self {
            forest,
            options,
            info,
        }
    }

    /// Render the tree starting at `start`, or the whole forest when `None`
    ///
    /// The whole forest is the tree under the root followed by the
    /// namespaces whose owners are invisible.
    pub fn render(&self, start: Option<NamespaceId>) -> Result<String> {
        let mut out = String::new();

        match start {
            Some(id) if id.is_invisible() => return Err(Error::UnknownNamespace(id)),
            Some(id) => self.render_node(&mut out, id, 0)?,
            None => {
                if let Some(root) = self.forest.root() {
                    self.render_node(&mut out, root, 0)?;
                }
                if self.forest.invisible().is_some() {
                    self.render_node(&mut out, NamespaceId::INVISIBLE, 0)?;
                }
            }
        }

        Ok(out)
    }

    fn render_node(&self, out: &mut String, id: NamespaceId, level: usize) -> Result<()> {
        let node = self.forest.get(id).ok_or(Error::UnknownNamespace(id))?;
        let indent = level * LEVEL_INDENT;
        let highlight = self.options.color && node.kind() == NamespaceKind::User;

        write!(out, "{:indent$}", "")?;
        if highlight {
            out.push_str(USERNS_COLOR);
        }
        if id.is_invisible() {
            out.push_str(INVISIBLE_LABEL);
        } else {
            write!(out, "{} {id}", node.kind())?;
        }
        if highlight {
            out.push_str(NORMAL);
        }
        out.push('\n');

        // Members belong to this exact namespace; a node may have none and
        // still have descendants with members.
        if self.options.show_pids && !node.members().is_empty() {
            let pids = node.sorted_members();
            if self.options.one_per_line() {
                self.annotated_list(out, indent, &pids)?;
            } else {
                self.packed_list(out, indent, &pids)?;
            }
        }

        for child in node.children() {
            self.render_node(out, *child, level + 1)?;
        }

        Ok(())
    }

    fn annotated_list(&self, out: &mut String, indent: usize, pids: &[ProcessId]) -> Result<()> {
        let pad = indent + MEMBER_INDENT;

        for &pid in pids {
            write!(out, "{:pad$}", "")?;

            if self.options.show_all_pids {
                match self.info.namespace_pids(pid) {
                    Some(ids) if ids.is_empty() => {}
                    Some(ids) => {
                        let ids: Vec<String> = ids.iter().map(ToString::to_string).collect();
                        self.colored(out, PID_COLOR, &format!("{{ {} }}  ", ids.join(" ")));
                    }
                    None => write!(out, "[can't open /proc/{pid}/status]")?,
                }
                if !self.options.show_command {
                    out.push('\n');
                }
            } else {
                self.colored(out, PID_COLOR, &format!("{:<5}  ", pid.as_raw()));
            }

            if self.options.show_command {
                match self.info.command_name(pid) {
                    Some(comm) => writeln!(out, "{comm}")?,
                    None => writeln!(out, "[can't open /proc/{pid}/comm]")?,
                }
            }
        }

        Ok(())
    }

    fn packed_list(&self, out: &mut String, indent: usize, pids: &[ProcessId]) -> Result<()> {
        let start_col = indent + MEMBER_INDENT;
        let mut col = start_col;

        for (i, pid) in pids.iter().enumerate() {
            let full = col > self.options.width.saturating_sub(PID_WIDTH)
                && col > start_col + MIN_DISPLAY_WIDTH;

            if i == 0 || full {
                if i > 0 {
                    self.end_color(out);
                    out.push('\n');
                }
                write!(out, "{:start_col$}", "")?;
                self.start_color(out, PID_COLOR);
                out.push_str(if i == 0 { "[ " } else { "  " });
                col = start_col + 2;
            }

            let text = pid.to_string();
            write!(out, "{text} ")?;
            col += text.len() + 1;
        }

        out.push(']');
        self.end_color(out);
        out.push('\n');
        Ok(())
    }

    fn colored(&self, out: &mut String, color: &str, text: &str) {
        self.start_color(out, color);
        out.push_str(text);
        self.end_color(out);
    }

    fn start_color(&self, out: &mut String, color: &str) {
        if self.options.color {
            out.push_str(color);
        }
    }

    fn end_color(&self, out: &mut String) {
        if self.options.color {
            out.push_str(NORMAL);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DiscoveryOptions, Hierarchy};
    use crate::probe::MockProbe;
    use std::collections::HashMap;

    #[derive(Default)]
    struct StubInfo {
        comm: HashMap<i32, String>,
        nstgid: HashMap<i32, Vec<i32>>,
    }

    impl ProcessInfo for StubInfo {
        fn command_name(&self, pid: ProcessId) -> Option<String> {
            self.comm.get(&pid.as_raw()).cloned()
        }

        fn namespace_pids(&self, pid: ProcessId) -> Option<Vec<i32>> {
            self.nstgid.get(&pid.as_raw()).cloned()
        }
    }

    fn pid(raw: i32) -> ProcessId {
        ProcessId::from_raw(raw)
    }

    fn plain() -> RenderOptions {
        RenderOptions::new().with_color(false)
    }

    fn pid_forest(members: &[i32]) -> NamespaceForest {
        let root = NamespaceId::new(5, 1);
        let child = NamespaceId::new(5, 100);
        let probe = MockProbe::new()
            .with_namespace(root, NamespaceKind::Pid)
            .with_namespace(child, NamespaceKind::Pid)
            .with_parent(child, root);
        let options = DiscoveryOptions::new().with_hierarchy(Hierarchy::Pid);

        let mut forest = NamespaceForest::new();
        forest.add(&probe, &root, None, &options).unwrap();
        for &raw in members {
            forest.add(&probe, &child, Some(pid(raw)), &options).unwrap();
        }
        forest
    }

    #[test]
    fn test_render_pid_tree() {
        let forest = pid_forest(&[20, 10]);
        let options = plain();
        let info = StubInfo::default();

        let text = TreeRenderer::new(&forest, &options, &info)
            .render(None)
            .unwrap();

        assert_eq!(text, "pid 5,1\n    pid 5,100\n            [ 10 20 ]\n");
    }

    #[test]
    fn test_render_invisible_ancestor() {
        let net = NamespaceId::new(7, 50);
        let probe = MockProbe::new().with_namespace(net, NamespaceKind::Net);
        let mut forest = NamespaceForest::new();
        forest
            .add(&probe, &net, Some(pid(3)), &DiscoveryOptions::new())
            .unwrap();
        let options = plain();

        let text = TreeRenderer::new(&forest, &options, &StubInfo::default())
            .render(None)
            .unwrap();

        assert_eq!(
            text,
            "[invisible ancestor user NS]\n    net 7,50\n            [ 3 ]\n"
        );
    }

    #[test]
    fn test_render_invisible_ancestor_colored_as_user() {
        let probe = MockProbe::new()
            .with_namespace(NamespaceId::new(7, 50), NamespaceKind::Net)
            .with_namespace(NamespaceId::new(7, 51), NamespaceKind::Ipc);
        let mut forest = NamespaceForest::new();
        for ino in [50, 51] {
            forest
                .add(&probe, &NamespaceId::new(7, ino), None, &DiscoveryOptions::new())
                .unwrap();
        }
        let options = RenderOptions::new();

        let text = TreeRenderer::new(&forest, &options, &StubInfo::default())
            .render(None)
            .unwrap();

        let first = text.lines().next().unwrap();
        assert_eq!(first, format!("{USERNS_COLOR}{INVISIBLE_LABEL}{NORMAL}"));
        assert!(text.contains("    net 7,50\n"));
        assert!(text.contains("    ipc 7,51\n"));
    }

    #[test]
    fn test_render_subtree() {
        let forest = pid_forest(&[1]);
        let options = plain().with_pids(false);

        let text = TreeRenderer::new(&forest, &options, &StubInfo::default())
            .render(Some(NamespaceId::new(5, 100)))
            .unwrap();

        assert_eq!(text, "pid 5,100\n");
    }

    #[test]
    fn test_render_rejects_invisible_and_unknown_start() {
        let forest = pid_forest(&[1]);
        let options = plain();
        let info = StubInfo::default();
        let renderer = TreeRenderer::new(&forest, &options, &info);

        assert!(matches!(
            renderer.render(Some(NamespaceId::INVISIBLE)),
            Err(Error::UnknownNamespace(_))
        ));
        assert!(matches!(
            renderer.render(Some(NamespaceId::new(9, 9))),
            Err(Error::UnknownNamespace(_))
        ));
    }

    #[test]
    fn test_show_command_with_vanished_process() {
        let forest = pid_forest(&[8, 4, 15]);
        let options = plain().with_command(true);
        let mut info = StubInfo::default();
        info.comm.insert(4, "init".to_string());
        info.comm.insert(15, "sleep".to_string());

        let text = TreeRenderer::new(&forest, &options, &info)
            .render(None)
            .unwrap();

        let pad = " ".repeat(12);
        assert_eq!(
            text,
            format!(
                "pid 5,1\n    pid 5,100\n{pad}4      init\n{pad}8      [can't open /proc/8/comm]\n{pad}15     sleep\n"
            )
        );
    }

    #[test]
    fn test_show_all_pids() {
        let forest = pid_forest(&[42, 7]);
        let options = plain().with_all_pids(true);
        let mut info = StubInfo::default();
        info.nstgid.insert(42, vec![42, 1]);

        let text = TreeRenderer::new(&forest, &options, &info)
            .render(None)
            .unwrap();

        let pad = " ".repeat(12);
        assert!(text.contains(&format!("{pad}[can't open /proc/7/status]\n")));
        assert!(text.contains(&format!("{pad}{{ 42 1 }}  \n")));
    }

    #[test]
    fn test_packed_list_wraps_at_width() {
        let forest = NamespaceForest::new();
        let options = plain().with_width(60);
        let info = StubInfo::default();
        let renderer = TreeRenderer::new(&forest, &options, &info);
        let pids: Vec<_> = (1000..1030).map(pid).collect();

        let mut out = String::new();
        renderer.packed_list(&mut out, 0, &pids).unwrap();

        let lines: Vec<_> = out.lines().collect();
        assert!(lines.len() > 1);
        assert!(lines[0].starts_with("        [ 1000 "));
        assert!(lines.last().unwrap().ends_with(']'));
        for line in &lines[1..] {
            assert!(line.starts_with("          "));
        }
        for line in &lines {
            assert!(line.len() <= 60 + PID_WIDTH);
        }
        let joined: Vec<_> = out
            .split_whitespace()
            .filter_map(|t| t.parse::<i32>().ok())
            .collect();
        assert_eq!(joined, (1000..1030).collect::<Vec<_>>());
    }

    #[test]
    fn test_packed_list_keeps_minimum_width_when_deeply_indented() {
        let forest = NamespaceForest::new();
        let options = plain().with_width(40);
        let info = StubInfo::default();
        let renderer = TreeRenderer::new(&forest, &options, &info);
        let pids: Vec<_> = (100..160).map(pid).collect();
        let indent = 10 * LEVEL_INDENT;

        let mut out = String::new();
        renderer.packed_list(&mut out, indent, &pids).unwrap();

        let lines: Vec<_> = out.lines().collect();
        assert!(lines.len() > 1);
        for line in &lines[..lines.len() - 1] {
            let content = &line[indent + MEMBER_INDENT..];
            assert!(content.len() > MIN_DISPLAY_WIDTH, "short line: {line:?}");
        }
    }

    #[test]
    fn test_packed_list_single_line_when_small() {
        let forest = NamespaceForest::new();
        let options = plain().with_width(10);
        let info = StubInfo::default();
        let renderer = TreeRenderer::new(&forest, &options, &info);

        let mut out = String::new();
        renderer
            .packed_list(&mut out, 0, &[pid(1), pid(2)])
            .unwrap();

        assert_eq!(out, "        [ 1 2 ]\n");
    }

    #[test]
    fn test_colored_packed_list() {
        let forest = pid_forest(&[5]);
        let options = RenderOptions::new();

        let text = TreeRenderer::new(&forest, &options, &StubInfo::default())
            .render(None)
            .unwrap();

        assert!(text.contains(&format!("            {PID_COLOR}[ 5 ]{NORMAL}\n")));
        assert!(text.starts_with("pid 5,1\n"));
    }
}

//! Host process table capture and parsing

use machine_core::{MachineError, Result};
use std::collections::HashSet;
use std::process::Command;

/// One row of the host process table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessTableEntry {
    pub ppid: u32,
    pub pid: u32,
    pub command: String,
}

/// Point-in-time snapshot of the host's `ppid`/`pid`/`command` triples.
///
/// Used to discover the descendants of a process right before a tree
/// kill. The snapshot is only as fresh as its capture; processes spawned
/// afterwards are invisible to it.
#[derive(Debug, Clone, Default)]
pub struct ProcessTable {
    entries: Vec<ProcessTableEntry>,
}

impl ProcessTable {
    /// Capture the current table by running the platform listing tool.
    ///
    /// Blocks until the listing completes; no timeout is applied, so
    /// callers that need bounded latency must wrap the call in their own
    /// deadline.
    pub fn capture() -> Result<Self> {
        let output = Command::new("ps")
            .args(["-A", "-o", "ppid,pid,comm"])
            .output()
            .map_err(|e| MachineError::Machine(format!("cannot run process listing: {e}")))?;
        if !output.status.success() {
            return Err(MachineError::Machine(format!(
                "process listing failed with {}",
                output.status
            )));
        }
        Ok(Self::parse(&String::from_utf8_lossy(&output.stdout)))
    }

    /// Parse listing output: three whitespace-separated columns,
    /// `<ppid> <pid> <command>`. Lines whose first two tokens are not
    /// numeric (the header, truncated garbage) are skipped.
    pub fn parse(text: &str) -> Self {
        let entries = text.lines().filter_map(parse_line).collect();
        Self { entries }
    }

    pub fn entries(&self) -> &[ProcessTableEntry] {
        &self.entries
    }

    pub fn contains(&self, pid: u32) -> bool {
        self.entries.iter().any(|e| e.pid == pid)
    }

    /// Direct children of `pid`, highest pid first.
    pub fn children_of(&self, pid: u32) -> Vec<u32> {
        let mut children: Vec<u32> = self
            .entries
            .iter()
            .filter(|e| e.ppid == pid && e.pid != pid)
            .map(|e| e.pid)
            .collect();
        children.sort_unstable_by(|a, b| b.cmp(a));
        children
    }

    /// Kill order for the tree rooted at `root`: depth-first, children
    /// before parents, the root last. The root is always included, even
    /// when the table no longer lists it.
    pub fn tree_kill_order(&self, root: u32) -> Vec<u32> {
        let mut order = Vec::new();
        let mut seen = HashSet::new();
        self.visit(root, &mut seen, &mut order);
        order
    }

    fn visit(&self, pid: u32, seen: &mut HashSet<u32>, order: &mut Vec<u32>) {
        // A malformed table could list a process among its own descendants.
        if !seen.insert(pid) {
            return;
        }
        for child in self.children_of(pid) {
            self.visit(child, seen, order);
        }
        order.push(pid);
    }
}

fn parse_line(line: &str) -> Option<ProcessTableEntry> {
    let trimmed = line.trim_start();
    let (ppid_tok, rest) = trimmed.split_once(char::is_whitespace)?;
    let ppid = ppid_tok.parse().ok()?;
    let rest = rest.trim_start();
    let (pid_tok, command) = match rest.split_once(char::is_whitespace) {
        Some((tok, command)) => (tok, command.trim_start()),
        None => (rest, ""),
    };
    let pid = pid_tok.parse().ok()?;
    Some(ProcessTableEntry {
        ppid,
        pid,
        command: command.trim_end().to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const LISTING: &str = "\
 PPID   PID COMMAND
    0     1 init
    1   100 supervise
  100   101 worker-a
  100   102 worker-b
  102   103 helper
";

    #[test]
    fn test_parse_skips_header() {
        let table = ProcessTable::parse(LISTING);
        assert_eq!(table.entries().len(), 5);
        assert!(table.contains(103));
        assert!(!table.contains(999));
    }

    #[test]
    fn test_parse_skips_garbage_and_blank_lines() {
        let table = ProcessTable::parse("\n<defunct>\n  1  2 ok\nnot numbers here\n\n");
        assert_eq!(
            table.entries(),
            &[ProcessTableEntry {
                ppid: 1,
                pid: 2,
                command: "ok".to_string(),
            }]
        );
    }

    #[test]
    fn test_parse_preserves_command_text() {
        let table = ProcessTable::parse("  1  42 some helper tool\n  1  43 kworker/0:1-events\n");
        assert_eq!(table.entries()[0].command, "some helper tool");
        assert_eq!(table.entries()[1].command, "kworker/0:1-events");
    }

    #[test]
    fn test_parse_tolerates_missing_command() {
        let table = ProcessTable::parse("12 34");
        assert_eq!(table.entries()[0].pid, 34);
        assert_eq!(table.entries()[0].command, "");
    }

    #[test]
    fn test_children_are_ordered_highest_pid_first() {
        let table = ProcessTable::parse(LISTING);
        assert_eq!(table.children_of(100), vec![102, 101]);
        assert_eq!(table.children_of(103), Vec::<u32>::new());
    }

    #[test]
    fn test_tree_kill_order_is_children_before_parent() {
        let table = ProcessTable::parse(LISTING);
        assert_eq!(table.tree_kill_order(100), vec![103, 102, 101, 100]);
    }

    #[test]
    fn test_tree_kill_order_for_unlisted_root() {
        let table = ProcessTable::parse(LISTING);
        assert_eq!(table.tree_kill_order(999), vec![999]);
    }

    #[test]
    fn test_tree_kill_order_survives_parent_loops() {
        let table = ProcessTable::parse("6 5\n5 6\n7 7\n");
        assert_eq!(table.tree_kill_order(5), vec![6, 5]);
        assert_eq!(table.tree_kill_order(7), vec![7]);
    }
}

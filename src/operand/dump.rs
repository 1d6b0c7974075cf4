//! Human-readable operand graph dumps for interactive debugging.
//!
//! Every node gets a `#n` label the first time it is printed. A node reached
//! again (shared operand or cycle) prints its label only, so dumps of cyclic
//! graphs terminate.

use super::user::User;
use hashbrown::HashMap;
use std::fmt;

/// Displays a node and everything reachable through its operands.
pub struct OperandDump<'u, 'a, K> {
    root: &'u User<'a, K>,
}

impl<'a, K> User<'a, K> {
    /// Printable view of this node's operand graph.
    pub fn dump_operands(&self) -> OperandDump<'_, 'a, K> {
        OperandDump { root: self }
    }
}

impl<'a, K: fmt::Debug> User<'a, K> {
    /// Print the operand graph to stderr.
    pub fn dump(&self) {
        eprintln!("{}", self.dump_operands());
    }
}

impl<K: fmt::Debug> fmt::Display for OperandDump<'_, '_, K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut labels = HashMap::new();
        write_node(f, self.root, 0, &mut labels)
    }
}

fn write_node<K: fmt::Debug>(
    f: &mut fmt::Formatter<'_>,
    user: &User<'_, K>,
    depth: usize,
    labels: &mut HashMap<*const (), usize>,
) -> fmt::Result {
    let key = user as *const User<'_, K> as *const ();
    if let Some(label) = labels.get(&key) {
        return writeln!(f, "#{} (see above)", label);
    }

    let label = labels.len();
    labels.insert(key, label);
    writeln!(f, "#{} {:?}", label, user.kind())?;

    for (index, slot) in user.operands().enumerate() {
        write!(f, "{:width$}[{}] ", "", index, width = (depth + 1) * 2)?;
        match slot.get() {
            Some(target) => write_node(f, target, depth + 1, labels)?,
            None => writeln!(f, "<empty>")?,
        }
    }
    Ok(())
}

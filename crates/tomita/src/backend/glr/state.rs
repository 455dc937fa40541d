//! Stack machine phase and run statistics

#[cfg(feature = "serialize")]
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Where the stack machine is within the current input position.
///
/// A call to [`StackMachine::step`](super::StackMachine::step) moves from
/// `Scanning` through `Reducing`/`Merging` and `Shifting` back to `Scanning`
/// of the next position, or ends in `Accepting` or `Rejected`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub enum Phase {
    /// Reading the lookahead token
    Scanning,
    /// Applying reductions over the frontier
    Reducing,
    /// Joining a reduction into an existing frontier node
    Merging,
    /// Pushing the lookahead onto every stack that can shift it
    Shifting,
    /// Input accepted; the forest is complete
    Accepting,
    /// Input rejected or parse cancelled
    Rejected,
}

impl Phase {
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Accepting | Self::Rejected)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Scanning => "scanning",
            Self::Reducing => "reducing",
            Self::Merging => "merging",
            Self::Shifting => "shifting",
            Self::Accepting => "accepting",
            Self::Rejected => "rejected",
        };
        f.write_str(name)
    }
}

/// Counters collected during one parse.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub struct ParseMetrics {
    pub tokens_consumed: usize,
    pub gss_nodes: usize,
    pub gss_edges: usize,
    /// Table cells executed with more than one action
    pub forks: usize,
    /// Reductions or shifts that joined an existing stack node
    pub stack_merges: usize,
    /// Derivations packed into an existing forest node
    pub forest_merges: usize,
    pub sweeps: usize,
    pub parse_time: Duration,
}

impl fmt::Display for ParseMetrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} tokens, {} gss nodes, {} gss edges, {} forks, {} stack merges, {} forest merges, {} sweeps in {:?}",
            self.tokens_consumed,
            self.gss_nodes,
            self.gss_edges,
            self.forks,
            self.stack_merges,
            self.forest_merges,
            self.sweeps,
            self.parse_time
        )
    }
}

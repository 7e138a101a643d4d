//! Port selection policy
//!
//! A `PortSpec` is a single port, an explicit list of at least three
//! candidates, or a two-element `[min, max]` range. `get_port` advances
//! through the spec deterministically given the previously bound port
//! (0 meaning "no previous attempt").

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PortSpec {
    Single(u16),
    List(Vec<u16>),
    Range(u16, u16),
}

impl PortSpec {
    /// Returns the next candidate port, or the exact error string the
    /// test corpus expects when the spec is exhausted.
    pub fn get_port(&self, prev: u16) -> Result<u16, String> {
        match self {
            PortSpec::Single(port) => Ok(*port),
            PortSpec::List(ports) => {
                let mut sorted = ports.clone();
                sorted.sort_unstable();
                sorted
                    .into_iter()
                    .find(|&p| p > prev)
                    .ok_or_else(|| format!("Out of list {:?}", ports))
            }
            PortSpec::Range(min, max) => {
                let candidate = if prev == 0 { *min } else { prev.max(*min) + 1 };
                if candidate > *max {
                    Err(format!("Out of range [{min} - {max}]"))
                } else {
                    Ok(candidate)
                }
            }
        }
    }
}

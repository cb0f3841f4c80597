//! Consistency checks for Simulink models.
//!
//! The transformation assumes that lines and the port records agree, that every input port is
//! driven exactly once, and that block names are unique. [`check`] verifies all of this and
//! reports every violation before any translation happens.

crate::prelude!();

use super::{Endpoint, Model};

/// A consistency violation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Issue {
    /// Two blocks with the same name.
    DuplicateBlock(String),
    /// A line endpoint mentions a block that does not exist.
    UnknownBlock {
        /// Line index.
        line: usize,
        /// Unknown block name.
        block: String,
    },
    /// A line endpoint mentions a port the block does not have.
    UnknownPort {
        /// Line index.
        line: usize,
        /// Faulty endpoint.
        endpoint: Endpoint,
    },
    /// A port records a line that does not exist.
    DanglingRecord {
        /// Port.
        endpoint: Endpoint,
        /// Recorded line index.
        line: usize,
    },
    /// A line attaches to a port that does not record it, or the other way around.
    AsymmetricRecord {
        /// Port.
        endpoint: Endpoint,
        /// Line index.
        line: usize,
    },
    /// An input port driven by several lines.
    MultiplyDriven(Endpoint),
    /// An input port no line drives.
    Undriven(Endpoint),
    /// A block whose parent is not a block of the model.
    UnknownParent {
        /// Block.
        block: String,
        /// Parent name.
        parent: String,
    },
    /// A line with no destination.
    EmptyLine(usize),
    /// A block with ports but no line at all.
    Unreachable(String),
}
impl fmt::Display for Issue {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::DuplicateBlock(name) => write!(fmt, "block name `{}` is not unique", name),
            Self::UnknownBlock { line, block } => {
                write!(fmt, "line {} mentions unknown block `{}`", line, block)
            }
            Self::UnknownPort { line, endpoint } => {
                write!(fmt, "line {} mentions unknown port `{}`", line, endpoint)
            }
            Self::DanglingRecord { endpoint, line } => {
                write!(fmt, "port `{}` records unknown line {}", endpoint, line)
            }
            Self::AsymmetricRecord { endpoint, line } => write!(
                fmt,
                "line {} and port `{}` disagree on their connection",
                line, endpoint
            ),
            Self::MultiplyDriven(endpoint) => {
                write!(fmt, "input port `{}` is driven by several lines", endpoint)
            }
            Self::Undriven(endpoint) => write!(fmt, "input port `{}` is not driven", endpoint),
            Self::UnknownParent { block, parent } => {
                write!(fmt, "block `{}` has unknown parent `{}`", block, parent)
            }
            Self::EmptyLine(line) => write!(fmt, "line {} has no destination", line),
            Self::Unreachable(block) => {
                write!(fmt, "block `{}` is not connected to anything", block)
            }
        }
    }
}

/// Result of a consistency check.
#[readonly::make]
#[derive(Debug, Clone, Default)]
pub struct Consistency {
    /// Violations, the model cannot be translated if there is any.
    pub issues: Vec<Issue>,
    /// Output ports driving no line, harmless.
    pub unconnected_outputs: Vec<Endpoint>,
}
impl Consistency {
    /// True if there are no issues.
    pub fn is_consistent(&self) -> bool {
        self.issues.is_empty()
    }
}

/// Checks a model, logs issues as errors and unconnected outputs as warnings.
pub fn check(model: &Model, log: &mut Log) -> Consistency {
    let mut res = Consistency::default();

    let mut names = Set::new();
    for block in &model.blocks {
        if !names.insert(block.name.as_str()) {
            res.issues.push(Issue::DuplicateBlock(block.name.clone()))
        }
        if let Some(parent) = &block.parent {
            if model.block_id(parent).is_none() {
                res.issues.push(Issue::UnknownParent {
                    block: block.name.clone(),
                    parent: parent.clone(),
                })
            }
        }
    }

    // Line side: endpoints exist and record the line.
    for (idx, line) in model.lines.iter().enumerate() {
        if line.dst.is_empty() {
            res.issues.push(Issue::EmptyLine(idx))
        }
        let endpoints = std::iter::once((&line.src, true))
            .chain(line.dst.iter().map(|dst| (dst, false)));
        for (endpoint, is_src) in endpoints {
            let block = match model.block_id(&endpoint.block) {
                Some(id) => model.block(id),
                None => {
                    res.issues.push(Issue::UnknownBlock {
                        line: idx,
                        block: endpoint.block.clone(),
                    });
                    continue;
                }
            };
            let port = if is_src {
                block.output(endpoint.port)
            } else {
                block.input(endpoint.port)
            };
            match port {
                None => res.issues.push(Issue::UnknownPort {
                    line: idx,
                    endpoint: endpoint.clone(),
                }),
                Some(port) if !port.lines.contains(&idx) => {
                    res.issues.push(Issue::AsymmetricRecord {
                        endpoint: endpoint.clone(),
                        line: idx,
                    })
                }
                Some(_) => (),
            }
        }
    }

    // Port side: recorded lines exist and mention the port, inputs are driven once.
    for block in &model.blocks {
        let has_ports = !block.inputs.is_empty() || !block.outputs.is_empty();
        let connected = model.lines.iter().any(|line| {
            line.src.block == block.name || line.dst.iter().any(|dst| dst.block == block.name)
        });
        if has_ports && !connected {
            res.issues.push(Issue::Unreachable(block.name.clone()))
        }
        let ports = block
            .inputs
            .iter()
            .map(|port| (port, false))
            .chain(block.outputs.iter().map(|port| (port, true)));
        for (port, is_output) in ports {
            let endpoint = Endpoint::new(block.name.clone(), port.index);
            for &line_idx in &port.lines {
                let line = match model.lines.get(line_idx) {
                    Some(line) => line,
                    None => {
                        res.issues.push(Issue::DanglingRecord {
                            endpoint: endpoint.clone(),
                            line: line_idx,
                        });
                        continue;
                    }
                };
                let attached = if is_output {
                    line.src == endpoint
                } else {
                    line.dst.contains(&endpoint)
                };
                if !attached {
                    res.issues.push(Issue::AsymmetricRecord {
                        endpoint: endpoint.clone(),
                        line: line_idx,
                    })
                }
            }

            let drivers = model
                .lines
                .iter()
                .filter(|line| {
                    if is_output {
                        line.src == endpoint
                    } else {
                        line.dst.contains(&endpoint)
                    }
                })
                .count();
            match (is_output, drivers) {
                (false, 0) => res.issues.push(Issue::Undriven(endpoint)),
                (false, 1) => (),
                (false, _) => res.issues.push(Issue::MultiplyDriven(endpoint)),
                (true, 0) => res.unconnected_outputs.push(endpoint),
                (true, _) => (),
            }
        }
    }

    for issue in &res.issues {
        log.error(issue.to_string())
    }
    for endpoint in &res.unconnected_outputs {
        log.warn(format!("output port `{}` is not connected", endpoint))
    }
    res
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::simulink::Block;

    fn chain() -> Model {
        let mut model = Model::new("chain");
        model.add_block(Block::new("src", "Constant").with_ports(0, 1));
        model.add_block(Block::new("gain", "Gain").with_ports(1, 1));
        model.add_block(Block::new("out", "Outport").with_ports(1, 0));
        model.connect(("src", 1), ("gain", 1)).unwrap();
        model.connect(("gain", 1), ("out", 1)).unwrap();
        model
    }

    #[test]
    fn consistent() {
        let mut log = Log::new();
        let res = check(&chain(), &mut log);
        assert!(res.is_consistent());
        assert!(res.unconnected_outputs.is_empty());
        assert!(log.is_empty());
    }

    #[test]
    fn unconnected_output_is_a_warning() {
        let mut model = chain();
        model.add_block(Block::new("split", "Demux").with_ports(1, 2));
        model.connect(("src", 1), ("split", 1)).unwrap();
        let mut log = Log::new();
        let res = check(&model, &mut log);
        assert!(res.is_consistent());
        assert_eq!(
            res.unconnected_outputs,
            vec![Endpoint::new("split", 1), Endpoint::new("split", 2)]
        );
        assert_eq!(log.count(Level::Warn), 2);
    }

    #[test]
    fn unreachable_block() {
        let mut model = chain();
        model.add_block(Block::new("dead", "Constant").with_ports(0, 1));
        // No ports, nothing to connect.
        model.add_block(Block::new("note", "DocBlock"));
        let mut log = Log::new();
        let res = check(&model, &mut log);
        assert_eq!(res.issues, vec![Issue::Unreachable("dead".into())]);
    }

    #[test]
    fn undriven_and_duplicate() {
        let mut model = chain();
        model.add_block(Block::new("gain", "Gain").with_ports(1, 0));
        let mut log = Log::new();
        let res = check(&model, &mut log);
        assert!(!res.is_consistent());
        assert!(res.issues.contains(&Issue::DuplicateBlock("gain".into())));
        assert_eq!(log.count(Level::Error), res.issues.len());
    }

    #[test]
    fn asymmetric_records() {
        let mut model = chain();
        // Second line pretends to also feed `gain`, which does not record it.
        model.lines[1].dst.push(Endpoint::new("gain", 1));
        model.blocks[0].outputs[0].lines.push(7);
        let mut log = Log::new();
        let res = check(&model, &mut log);
        assert!(res.issues.contains(&Issue::AsymmetricRecord {
            endpoint: Endpoint::new("gain", 1),
            line: 1,
        }));
        assert!(res.issues.contains(&Issue::MultiplyDriven(Endpoint::new("gain", 1))));
        assert!(res.issues.contains(&Issue::DanglingRecord {
            endpoint: Endpoint::new("src", 1),
            line: 7,
        }));
    }

    #[test]
    fn unknown_endpoints() {
        let mut model = chain();
        model.lines.push(crate::simulink::Line {
            src: Endpoint::new("nope", 1),
            dst: vec![Endpoint::new("out", 3)],
        });
        let mut log = Log::new();
        let res = check(&model, &mut log);
        assert!(res.issues.contains(&Issue::UnknownBlock {
            line: 2,
            block: "nope".into(),
        }));
        assert!(res.issues.contains(&Issue::UnknownPort {
            line: 2,
            endpoint: Endpoint::new("out", 3),
        }));
    }
}

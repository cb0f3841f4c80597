//! Simulink block graphs.
//!
//! A [`Model`] is a flat list of blocks, each with numbered input and output ports, and a list of
//! lines. A line has one source (an output port) and one or more destinations (input ports).
//! Ports record the index of the lines attached to them; [`check`] verifies that the two views
//! agree.
//!
//! Models are (de)serialized as JSON:
//!
//! ```rust
//! # use sldl::simulink::Model;
//! let model = Model::from_json(r#"{
//!     "name": "demo",
//!     "blocks": [
//!         { "name": "src", "type": "Constant", "params": { "Value": "1" },
//!           "outputs": [ { "index": 1, "lines": [0] } ] },
//!         { "name": "out", "type": "Outport",
//!           "inputs": [ { "index": 1, "lines": [0] } ] }
//!     ],
//!     "lines": [
//!         { "src": { "block": "src", "port": 1 }, "dst": [ { "block": "out", "port": 1 } ] }
//!     ]
//! }"#).unwrap();
//! let out = model.block_id("out").unwrap();
//! assert_eq!(model.driver(out, 1), Some((0, 1)));
//! ```

crate::prelude!();

use serde::{Deserialize, Serialize};

pub mod check;

fn one() -> usize {
    1
}

/// A block port.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Port {
    /// Port number, starts at `1`.
    pub index: usize,
    /// Signal width.
    #[serde(default = "one")]
    pub width: usize,
    /// Indices of the lines attached to this port.
    #[serde(default)]
    pub lines: Vec<usize>,
}
impl Port {
    /// Scalar port constructor.
    pub fn new(index: usize) -> Self {
        Self {
            index,
            width: 1,
            lines: vec![],
        }
    }
}

/// A block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    /// Name, unique in the model.
    pub name: String,
    /// Block type, *e.g.* `Gain`.
    #[serde(rename = "type")]
    pub typ: String,
    /// Parameters, as written in the model.
    #[serde(default)]
    pub params: IndexMap<String, String>,
    /// Input ports.
    #[serde(default)]
    pub inputs: Vec<Port>,
    /// Output ports.
    #[serde(default)]
    pub outputs: Vec<Port>,
    /// Name of the enclosing subsystem, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
}

impl Block {
    /// Constructor, no ports and no parameters.
    pub fn new(name: impl Into<String>, typ: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            typ: typ.into(),
            params: IndexMap::new(),
            inputs: vec![],
            outputs: vec![],
            parent: None,
        }
    }
    /// Sets the number of scalar input and output ports.
    pub fn with_ports(mut self, inputs: usize, outputs: usize) -> Self {
        self.inputs = (1..=inputs).map(Port::new).collect();
        self.outputs = (1..=outputs).map(Port::new).collect();
        self
    }
    /// Sets the width of all the ports.
    pub fn with_width(mut self, width: usize) -> Self {
        for port in self.inputs.iter_mut().chain(self.outputs.iter_mut()) {
            port.width = width
        }
        self
    }
    /// Sets a parameter.
    pub fn with_param(mut self, key: impl Into<String>, val: impl Into<String>) -> Self {
        self.params.insert(key.into(), val.into());
        self
    }
    /// Sets the parent subsystem.
    pub fn with_parent(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    /// Parameter accessor.
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }
    /// Input port accessor, `index` starts at `1`.
    pub fn input(&self, index: usize) -> Option<&Port> {
        self.inputs.iter().find(|port| port.index == index)
    }
    /// Output port accessor, `index` starts at `1`.
    pub fn output(&self, index: usize) -> Option<&Port> {
        self.outputs.iter().find(|port| port.index == index)
    }
    fn input_mut(&mut self, index: usize) -> Option<&mut Port> {
        self.inputs.iter_mut().find(|port| port.index == index)
    }
    fn output_mut(&mut self, index: usize) -> Option<&mut Port> {
        self.outputs.iter_mut().find(|port| port.index == index)
    }
}

/// A port of a specific block.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Endpoint {
    /// Block name.
    pub block: String,
    /// Port number, starts at `1`.
    pub port: usize,
}
impl Endpoint {
    /// Constructor.
    pub fn new(block: impl Into<String>, port: usize) -> Self {
        Self {
            block: block.into(),
            port,
        }
    }
}
impl fmt::Display for Endpoint {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        write!(fmt, "{}#{}", self.block, self.port)
    }
}

/// A line, from an output port to some input ports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Line {
    /// Source output port.
    pub src: Endpoint,
    /// Destination input ports.
    pub dst: Vec<Endpoint>,
}

/// A Simulink model.
#[readonly::make]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Model {
    /// Model name.
    pub name: String,
    /// Blocks, in declaration order.
    #[serde(default)]
    pub blocks: Vec<Block>,
    /// Lines.
    #[serde(default)]
    pub lines: Vec<Line>,
}

impl Model {
    /// Empty model constructor.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            blocks: vec![],
            lines: vec![],
        }
    }

    /// Parses a model from JSON.
    pub fn from_json(json: &str) -> Res<Self> {
        Ok(serde_json::from_str(json)?)
    }
    /// Reads a model from a JSON file.
    pub fn load(path: impl AsRef<std::path::Path>) -> Res<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .chain_err(|| format!("while reading model file `{}`", path.display()))?;
        Self::from_json(&text)
            .chain_err(|| format!("while parsing model file `{}`", path.display()))
    }
    /// Serializes the model to pretty JSON.
    pub fn to_json(&self) -> Res<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Adds a block, returns its identifier.
    pub fn add_block(&mut self, block: Block) -> BlockId {
        self.blocks.push(block);
        self.blocks.len() - 1
    }

    /// Connects an output port to an input port.
    ///
    /// Connecting a source that already drives a line adds a branch to that line. The line is
    /// recorded on both ports. Returns the index of the line.
    pub fn connect(&mut self, src: (&str, usize), dst: (&str, usize)) -> Res<usize> {
        let src_id = self.known(src.0)?;
        let dst_id = self.known(dst.0)?;
        if self.blocks[src_id].output(src.1).is_none() {
            bail!("block `{}` has no output port {}", src.0, src.1)
        }
        if self.blocks[dst_id].input(dst.1).is_none() {
            bail!("block `{}` has no input port {}", dst.0, dst.1)
        }

        let src = Endpoint::new(src.0, src.1);
        let dst = Endpoint::new(dst.0, dst.1);
        let line = match self.lines.iter().position(|line| line.src == src) {
            Some(line) => {
                self.lines[line].dst.push(dst.clone());
                line
            }
            None => {
                self.lines.push(Line {
                    src: src.clone(),
                    dst: vec![dst.clone()],
                });
                self.lines.len() - 1
            }
        };

        if let Some(port) = self.blocks[src_id].output_mut(src.port) {
            if !port.lines.contains(&line) {
                port.lines.push(line)
            }
        }
        if let Some(port) = self.blocks[dst_id].input_mut(dst.port) {
            port.lines.push(line)
        }
        Ok(line)
    }

    fn known(&self, name: &str) -> Res<BlockId> {
        self.block_id(name)
            .ok_or_else(|| ErrorKind::UnknownBlock(name.into()).into())
    }

    /// Identifier of the block with some name.
    pub fn block_id(&self, name: &str) -> Option<BlockId> {
        self.blocks.iter().position(|block| block.name == name)
    }
    /// Block accessor.
    pub fn block(&self, id: BlockId) -> &Block {
        &self.blocks[id]
    }
    /// Mutable block accessor, the lines are left untouched.
    pub fn block_mut(&mut self, id: BlockId) -> &mut Block {
        &mut self.blocks[id]
    }

    /// Block and output port driving an input port of a block.
    pub fn driver(&self, block: BlockId, port: usize) -> Option<(BlockId, usize)> {
        let name = &self.blocks.get(block)?.name;
        self.lines
            .iter()
            .find(|line| {
                line.dst
                    .iter()
                    .any(|dst| &dst.block == name && dst.port == port)
            })
            .and_then(|line| {
                self.block_id(&line.src.block)
                    .map(|src| (src, line.src.port))
            })
    }

    /// Blocks driving at least one input of a block, deduplicated, in port order.
    pub fn predecessors(&self, block: BlockId) -> IndexSet<BlockId> {
        self.blocks[block]
            .inputs
            .iter()
            .filter_map(|port| self.driver(block, port.index))
            .map(|(pred, _)| pred)
            .collect()
    }

    /// Names of the subsystems enclosing a block, outermost first.
    pub fn namespace(&self, block: BlockId) -> Vec<&str> {
        let mut res = vec![];
        let mut current = self.blocks[block].parent.as_deref();
        // A parent cycle cannot be longer than the number of blocks.
        while let Some(parent) = current {
            if res.len() >= self.blocks.len() {
                break;
            }
            res.push(parent);
            current = self
                .block_id(parent)
                .and_then(|id| self.blocks[id].parent.as_deref());
        }
        res.reverse();
        res
    }
}

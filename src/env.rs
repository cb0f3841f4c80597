//! Translation environment.
//!
//! The [`Environment`] maps each block output port to the dL term carrying its signal, shared by
//! all the block transformers. Signals are created on first access, either when the producer is
//! translated or when a consumer reads its input, so the translation order does not matter.
//!
//! A block translation runs between [`Environment::begin`] and either [`Environment::commit`]
//! or [`Environment::rollback`]: a failed block leaves no variable behind.

crate::prelude!();

use simulink::Model;

/// Replaces characters dL identifiers cannot contain.
///
/// ```rust
/// # use sldl::env::sanitize;
/// assert_eq!(sanitize("Sub System/Gain 1"), "Sub_System_Gain_1");
/// assert_eq!(sanitize("1st"), "b1st");
/// assert_eq!(sanitize("x'"), "x");
/// ```
pub fn sanitize(name: &str) -> String {
    let mut res = String::with_capacity(name.len());
    let mut pending_sep = false;
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_sep && !res.is_empty() {
                res.push('_')
            }
            pending_sep = false;
            res.push(c)
        } else {
            pending_sep = true
        }
    }
    if res.is_empty() {
        res.push('b')
    } else if res.starts_with(|c: char| c.is_ascii_digit()) {
        res.insert(0, 'b')
    }
    res
}

/// Identifier of a block: its name prefixed by the names of its enclosing subsystems.
pub fn block_name(graph: &Model, block: BlockId) -> String {
    let mut name: Vec<&str> = graph.namespace(block);
    name.push(&graph.block(block).name);
    sanitize(&name.join("_"))
}

/// Signal table and name registry.
#[derive(Debug, Default)]
pub struct Environment {
    signals: IndexMap<(BlockId, usize), Term>,
    names: Set<String>,
    vars: Vec<Var>,
    journal: Option<Journal>,
    /// Diagnostics of the translation.
    pub log: Log,
}

/// What the current block translation created.
#[derive(Debug, Default)]
struct Journal {
    signals: Vec<(BlockId, usize)>,
    names: Vec<String>,
    vars: usize,
}

impl Environment {
    /// Constructor.
    pub fn new(log: Log) -> Self {
        Self {
            log,
            ..Self::default()
        }
    }

    /// Starts a block translation.
    pub fn begin(&mut self) {
        self.journal = Some(Journal {
            vars: self.vars.len(),
            ..Journal::default()
        })
    }
    /// Ends a block translation, returns the variables it created.
    pub fn commit(&mut self) -> Vec<Var> {
        let start = self.journal.take().map(|j| j.vars).unwrap_or(self.vars.len());
        self.vars[start..].to_vec()
    }
    /// Cancels a block translation: forgets the signals and names it created.
    pub fn rollback(&mut self) {
        if let Some(journal) = self.journal.take() {
            for key in journal.signals {
                self.signals.shift_remove(&key);
            }
            for name in journal.names {
                self.names.remove(&name);
            }
            self.vars.truncate(journal.vars)
        }
    }

    /// All the variables created so far.
    pub fn vars(&self) -> &[Var] {
        &self.vars
    }

    /// Reserves a name, adding a numeric suffix if it is taken.
    fn reserve(&mut self, base: &str) -> String {
        let mut name = base.to_string();
        let mut cnt = 1;
        while self.names.contains(&name) {
            name = format!("{}_{}", base, cnt);
            cnt += 1;
        }
        self.names.insert(name.clone());
        if let Some(journal) = &mut self.journal {
            journal.names.push(name.clone())
        }
        name
    }

    /// Creates a fresh variable.
    pub fn fresh_var(&mut self, base: &str) -> Var {
        let name = self.reserve(&sanitize(base));
        let var = Var::real(name);
        self.vars.push(var.clone());
        var
    }
    /// Creates a signal of some width: a variable if `width` is one, a vector of component
    /// variables `base1`, `base2`... otherwise.
    pub fn fresh_signal(&mut self, base: &str, width: usize) -> Term {
        if width <= 1 {
            return Term::var(self.fresh_var(base));
        }
        let base = self.reserve(&sanitize(base));
        let items = (1..=width)
            .map(|idx| {
                let name = self.reserve(&format!("{}{}", base, idx));
                let var = Var::real(name);
                self.vars.push(var.clone());
                Term::var(var)
            })
            .collect();
        Term::vector(items)
    }

    /// Base name of the signal of an output port.
    ///
    /// The [`block_name`], suffixed with the port number if the block has several outputs.
    pub fn signal_name(graph: &Model, block: BlockId, port: usize) -> String {
        let name = block_name(graph, block);
        if graph.block(block).outputs.len() > 1 {
            format!("{}_{}", name, port)
        } else {
            name
        }
    }

    /// Signal of an output port, created if needed.
    pub fn signal(&mut self, graph: &Model, block: BlockId, port: usize) -> Res<Term> {
        if let Some(term) = self.signals.get(&(block, port)) {
            return Ok(term.clone());
        }
        let b = graph.block(block);
        let width = match b.output(port) {
            Some(p) => p.width,
            None => bail!("block `{}` has no output port {}", b.name, port),
        };
        let name = Self::signal_name(graph, block, port);
        let term = self.fresh_signal(&name, width);
        self.register(block, port, term.clone());
        Ok(term)
    }

    /// Signal driving an input port.
    pub fn input(&mut self, graph: &Model, block: BlockId, port: usize) -> Res<Term> {
        match graph.driver(block, port) {
            Some((src, src_port)) => self.signal(graph, src, src_port),
            None => bail!(ErrorKind::UndrivenInput(graph.block(block).name.clone(), port)),
        }
    }

    /// Binds an output port to some term, instead of a fresh variable.
    ///
    /// Fails if the signal already exists.
    pub fn bind_signal(&mut self, block: BlockId, port: usize, term: Term) -> Res<()> {
        if let Some(prev) = self.signals.get(&(block, port)) {
            bail!("output port {} of block #{} is already bound to `{}`", port, block, prev)
        }
        self.register(block, port, term);
        Ok(())
    }

    /// True if an output port has a signal.
    pub fn is_bound(&self, block: BlockId, port: usize) -> bool {
        self.signals.contains_key(&(block, port))
    }

    fn register(&mut self, block: BlockId, port: usize, term: Term) {
        self.signals.insert((block, port), term);
        if let Some(journal) = &mut self.journal {
            journal.signals.push((block, port))
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use simulink::Block;

    fn graph() -> Model {
        let mut model = Model::new("env");
        model.add_block(Block::new("ctl", "SubSystem"));
        model.add_block(
            Block::new("demux", "Demux")
                .with_ports(0, 2)
                .with_parent("ctl"),
        );
        model.add_block(Block::new("pos", "Inport").with_ports(0, 1).with_width(3));
        model.add_block(Block::new("ctl_demux_1", "Gain").with_ports(1, 1));
        model.connect(("demux", 1), ("ctl_demux_1", 1)).unwrap();
        model
    }

    #[test]
    fn signal_names() {
        let graph = graph();
        let mut env = Environment::default();
        let demux1 = env.signal(&graph, 1, 1).unwrap();
        assert_eq!(demux1.to_string(), "ctl_demux_1");
        // Same port, same signal.
        assert_eq!(env.input(&graph, 3, 1).unwrap(), demux1);
        let gain = env.signal(&graph, 3, 1).unwrap();
        assert_eq!(gain.to_string(), "ctl_demux_1_1");
        let pos = env.signal(&graph, 2, 1).unwrap();
        assert_eq!(pos.to_string(), "(pos1, pos2, pos3)");
        assert_eq!(env.vars().len(), 5);
    }

    #[test]
    fn undriven_input() {
        let graph = graph();
        let mut env = Environment::default();
        assert!(env.signal(&graph, 2, 2).is_err());
        let mut graph = graph;
        graph.add_block(Block::new("lonely", "Gain").with_ports(1, 1));
        let err = env.input(&graph, 4, 1).unwrap_err();
        match err.kind() {
            ErrorKind::UndrivenInput(block, 1) => assert_eq!(block, "lonely"),
            kind => panic!("unexpected error {}", kind),
        }
    }

    #[test]
    fn rollback_forgets_everything() {
        let graph = graph();
        let mut env = Environment::default();
        env.begin();
        let pos = env.signal(&graph, 2, 1).unwrap();
        assert_eq!(env.commit().len(), 3);

        env.begin();
        env.signal(&graph, 1, 1).unwrap();
        env.fresh_var("tmp");
        env.rollback();
        assert!(!env.is_bound(1, 1));
        assert_eq!(env.vars().len(), 3);
        assert_eq!(env.fresh_var("tmp").name(), "tmp");
        assert_eq!(env.signal(&graph, 2, 1).unwrap(), pos);
    }

    #[test]
    fn bound_signals() {
        let mut env = Environment::default();
        env.bind_signal(0, 1, term!(3)).unwrap();
        assert!(env.bind_signal(0, 1, term!(4)).is_err());
        assert!(env.is_bound(0, 1));
    }
}

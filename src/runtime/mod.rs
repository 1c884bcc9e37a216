//! Cooperative simulation driver
//!
//! Runs a compiled [`Program`] one atomic step at a time. The driver owns an
//! explicit stack of runtime nodes instead of recursing through the
//! construct tree, so control can be handed back to the caller between any
//! two steps and resumed exactly where it left off.
//!
//! A step proceeds in two phases:
//!
//! 1. settle: finished nodes are popped, and the top node is asked what to
//!    push next (`up_next`) until it has nothing left to schedule
//! 2. execute: the top node performs exactly one program-visible unit of
//!    work (`exec_step`)
//!
//! Startup mirrors a hosted C++ program: globals are initialized in
//! declaration order, then a synthesized call to `main` runs, then `main`'s
//! return-slot temporary is destroyed. A fatal event (null-pointer
//! dereference) halts the simulation where it stands;
//! everything else is logged and the program keeps running with explicitly
//! invalid values.

pub mod events;
pub mod nodes;

use tracing::{debug, trace};

use crate::constructs::Program;
use crate::memory::object::StorageKind;
use crate::memory::value::Value;
use crate::memory::Memory;
use events::{SimEvent, SimulationListener};
use nodes::{NodeId, RtNode};

/// Where the simulation stands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimStatus {
    Running,
    /// `main` returned and all cleanup ran
    Finished,
    /// A fatal event stopped execution
    Crashed,
}

/// A single run of a compiled program
pub struct Simulation<'p> {
    pub(crate) program: &'p Program,
    pub(crate) memory: Memory,
    pub(crate) nodes: Vec<RtNode>,
    /// Execution stack of node ids; the top is the node in control
    pub(crate) stack: Vec<NodeId>,
    pub(crate) events: Vec<SimEvent>,
    pub(crate) listeners: Vec<Box<dyn SimulationListener>>,
    pub(crate) crashed: bool,
    steps: usize,
}

impl<'p> Simulation<'p> {
    pub fn new(program: &'p Program) -> Self {
        let mut sim = Simulation {
            program,
            memory: Memory::new(),
            nodes: Vec::new(),
            stack: Vec::new(),
            events: Vec::new(),
            listeners: Vec::new(),
            crashed: false,
            steps: 0,
        };

        // Bootstrap frame: globals and the call to main evaluate here.
        sim.memory.push_frame(program.main);

        // Static storage exists before any initializer runs.
        for global in &program.globals {
            let entity = program.symbols.entity(global.entity);
            if entity.ty.is_reference() {
                continue;
            }
            let object = sim.memory.allocate(
                &entity.name,
                &entity.ty,
                StorageKind::Static,
                &program.symbols,
            );
            sim.memory.globals.insert(global.entity, object);
        }

        // Work list in execution order, pushed in reverse so the first entry
        // runs first.
        let mut plan: Vec<NodeId> = Vec::new();
        for global in &program.globals {
            let node = sim.new_node(global.init, None, 0);
            sim.nodes[node].target_object = sim.memory.globals.get(&global.entity).copied();
            sim.nodes[node].target_frame = Some(0);
            plan.push(node);
            if let Some(dealloc) = global.temp_dealloc {
                plan.push(sim.new_node(dealloc, None, 0));
            }
        }
        plan.push(sim.new_node(program.main_call, None, 0));
        if let Some(dealloc) = program.main_dealloc {
            plan.push(sim.new_node(dealloc, None, 0));
        }
        sim.stack.extend(plan.into_iter().rev());

        debug!(nodes = sim.nodes.len(), "simulation ready");
        sim
    }

    pub fn status(&self) -> SimStatus {
        if self.crashed {
            SimStatus::Crashed
        } else if self.stack.is_empty() {
            SimStatus::Finished
        } else {
            SimStatus::Running
        }
    }

    pub fn is_done(&self) -> bool {
        self.status() != SimStatus::Running
    }

    /// Advance by one atomic step. Returns false when nothing further can
    /// run.
    pub fn step_forward(&mut self) -> bool {
        if self.is_done() {
            return false;
        }
        loop {
            let top = match self.stack.last().copied() {
                Some(top) => top,
                None => return false,
            };
            if self.nodes[top].done {
                self.stack.pop();
                continue;
            }
            // Settle phase: scheduling only, repeated until the top node is
            // ready to execute.
            if self.up_next(top) {
                if self.crashed {
                    return false;
                }
                continue;
            }
            trace!(node = top, construct = self.nodes[top].construct, "step");
            self.exec_step(top);
            self.steps += 1;
            if self.nodes[top].done && self.stack.last() == Some(&top) {
                self.stack.pop();
            }
            return !self.crashed;
        }
    }

    /// Run until completion or until `max_steps` further steps have
    /// executed; returns the number of steps taken
    pub fn run(&mut self, max_steps: usize) -> usize {
        let mut taken = 0;
        while taken < max_steps && self.step_forward() {
            taken += 1;
        }
        taken
    }

    /// Step once, then keep stepping until control returns to the current
    /// depth (a call stepped over runs to completion)
    pub fn step_over(&mut self) {
        let depth = self.stack.len();
        if !self.step_forward() {
            return;
        }
        while self.stack.len() > depth && self.step_forward() {}
    }

    /// Keep stepping until the current node (and everything above it) has
    /// finished
    pub fn step_out(&mut self) {
        let depth = self.stack.len();
        while self.stack.len() >= depth && !self.is_done() && self.step_forward() {}
    }

    pub fn steps(&self) -> usize {
        self.steps
    }

    pub fn events(&self) -> &[SimEvent] {
        &self.events
    }

    pub fn memory(&self) -> &Memory {
        &self.memory
    }

    pub fn add_listener(&mut self, listener: Box<dyn SimulationListener>) {
        self.listeners.push(listener);
    }

    /// The value `main` returned, once the simulation has finished. The
    /// return slot is a temporary of the bootstrap frame; its value survives
    /// the end of its lifetime for inspection.
    pub fn main_return(&self) -> Option<Value> {
        let call = match &self.program.constructs[self.program.main_call].kind {
            crate::constructs::ConstructKind::Call(fc) => fc,
            _ => return None,
        };
        let slot = call.return_slot?;
        let object = self.memory.frames.first()?.temporaries.get(&slot).copied()?;
        Some(self.memory.read_value(object).value)
    }

    /// Objects currently observable, for display front ends: every object
    /// whose lifetime has started and not ended
    pub fn live_objects(&self) -> impl Iterator<Item = &crate::memory::object::Object> {
        self.memory.objects.iter().filter(|o| o.is_alive())
    }

    /// The construct the next step will execute, when one is scheduled
    pub fn current_construct(&self) -> Option<crate::constructs::ConstructId> {
        self.stack.last().map(|&n| self.nodes[n].construct)
    }
}

impl std::fmt::Debug for Simulation<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Simulation")
            .field("status", &self.status())
            .field("steps", &self.steps)
            .field("stack_depth", &self.stack.len())
            .field("events", &self.events.len())
            .finish()
    }
}

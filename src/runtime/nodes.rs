//! Runtime nodes: the per-construct micro-state machines
//!
//! Every fully compiled construct can instantiate a runtime node. A node
//! exposes exactly two operations to the driver:
//!
//! - `up_next`: decide what (if anything) to push onto the execution stack;
//!   may advance bookkeeping state but performs no program-visible work
//! - `exec_step`: perform exactly one atomic unit of program-visible work
//!
//! Micro-state is an explicit enum per construct family (`PUSH → ARGUMENTS
//! → CALL → RETURN` for calls, and so on), never host recursion depth, so
//! the driver can stop and resume after any single step. Cleanup runs
//! through the same node machinery as ordinary code: deallocators push
//! destructor calls onto the same stack.

use super::events::{CrashReason, SimEvent, UbReason, UnspecifiedReason};
use super::Simulation;
use crate::constructs::{
    BinaryOp, ConstructId, ConstructKind, Conversion, ExprKind, InitKind, Initializer, LogicalOp,
    Statement, UnaryOp,
};
use crate::entities::{EntityId, EntityKind, FunctionKind};
use crate::memory::object::{ObjectData, StorageKind};
use crate::memory::value::{PointerValue, Value};
use crate::memory::ObjectId;
use crate::types::{Type, TypeKind};

/// Index of a node in the simulation's node arena
pub type NodeId = usize;

/// Result of a finished node
#[derive(Debug, Clone)]
pub enum RtValue {
    /// An lvalue, or an object-backed prvalue (return slot, materialized
    /// temporary)
    Object(ObjectId),
    /// A pure prvalue
    Value { value: Value, valid: bool },
}

/// Expression micro-states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExprState {
    Start,
    /// Operands pushed so far
    Operand(usize),
    /// All operands evaluated; one visible step remains
    Operate,
}

/// Function-call micro-states (the four-phase protocol, plus receiver
/// evaluation before it)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallState {
    Receiver,
    Push,
    Arguments(usize),
    Body(usize),
}

/// Initializer micro-states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitState {
    Start,
    /// Source expression pushed
    Source,
    /// Lifetime began; child initializers/constructor call in progress
    Began(usize),
}

/// Deallocator micro-states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeallocState {
    /// Next position in the reversed destruction order
    Cursor(usize),
    /// Destructor (if any) has run; one kill step remains
    Destroy(usize),
}

/// Statement micro-states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StmtState {
    Start,
    Item(usize),
    Finish,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RtState {
    Expr(ExprState),
    Call(CallState),
    Init(InitState),
    Dealloc(DeallocState),
    Stmt(StmtState),
}

/// One runtime node
#[derive(Debug)]
pub struct RtNode {
    pub construct: ConstructId,
    pub parent: Option<NodeId>,
    /// Frame the node evaluates in
    pub frame: usize,
    pub state: RtState,
    pub result: Option<RtValue>,
    pub done: bool,
    /// Child nodes in creation order
    pub children: Vec<NodeId>,
    /// Object injected by the parent: initializer target, call receiver, or
    /// the object a deallocator is about to destroy
    pub target_object: Option<ObjectId>,
    /// Frame that owns the bindings an initializer establishes (the callee
    /// frame for argument initializers); defaults to `frame`
    pub target_frame: Option<usize>,
    /// Frame pushed by a call node
    pub callee_frame: Option<usize>,
}

impl<'p> Simulation<'p> {
    /// Create a node for `construct` without pushing it
    pub(crate) fn new_node(
        &mut self,
        construct: ConstructId,
        parent: Option<NodeId>,
        frame: usize,
    ) -> NodeId {
        let state = match &self.program.constructs[construct].kind {
            ConstructKind::Expr(_) => RtState::Expr(ExprState::Start),
            ConstructKind::Call(_) => RtState::Call(CallState::Receiver),
            ConstructKind::Init(_) => RtState::Init(InitState::Start),
            ConstructKind::TempDealloc(_) | ConstructKind::ObjDealloc(_) => {
                RtState::Dealloc(DeallocState::Cursor(0))
            }
            ConstructKind::Stmt(_) => RtState::Stmt(StmtState::Start),
        };
        self.nodes.push(RtNode {
            construct,
            parent,
            frame,
            state,
            result: None,
            done: false,
            children: Vec::new(),
            target_object: None,
            target_frame: None,
            callee_frame: None,
        });
        self.nodes.len() - 1
    }

    /// Create a child node and push it onto the execution stack
    fn spawn(&mut self, construct: ConstructId, parent: NodeId, frame: usize) -> NodeId {
        let id = self.new_node(construct, Some(parent), frame);
        self.nodes[parent].children.push(id);
        self.stack.push(id);
        id
    }

    fn child(&self, node: NodeId, index: usize) -> NodeId {
        self.nodes[node].children[index]
    }

    fn result_of(&self, node: NodeId) -> RtValue {
        self.nodes[node]
            .result
            .clone()
            .expect("child node finished without a result")
    }

    fn object_of(&self, node: NodeId) -> ObjectId {
        match self.result_of(node) {
            RtValue::Object(o) => o,
            RtValue::Value { .. } => panic!("expected an object-designating result"),
        }
    }

    /// The value of a finished prvalue child, reading through an
    /// object-backed result (return slots, materialized temporaries) without
    /// emitting events: those reads are engine plumbing, not program reads
    fn consume(&self, node: NodeId) -> (Value, bool) {
        match self.result_of(node) {
            RtValue::Value { value, valid } => (value, valid),
            RtValue::Object(o) => {
                let outcome = self.memory.read_value(o);
                (outcome.value, outcome.valid)
            }
        }
    }

    fn emit(&mut self, event: SimEvent) {
        for listener in &mut self.listeners {
            listener.on_event(&event);
        }
        if event.is_fatal() {
            self.crashed = true;
        }
        self.events.push(event);
    }

    fn emit_ub(&mut self, construct: ConstructId, reason: UbReason) {
        self.emit(SimEvent::UndefinedBehavior { construct, reason });
    }

    // ==================================================================
    // up_next: push work, no program-visible effects

    /// Returns true when something was pushed (or the node finished with no
    /// visible work left); false when the node is ready for `exec_step`
    pub(crate) fn up_next(&mut self, node: NodeId) -> bool {
        let construct = self.nodes[node].construct;
        match self.program.constructs[construct].kind.clone() {
            ConstructKind::Expr(e) => self.up_next_expr(node, &e.kind),
            ConstructKind::Call(fc) => self.up_next_call(node, &fc),
            ConstructKind::Init(init) => self.up_next_init(node, &init),
            ConstructKind::TempDealloc(_) | ConstructKind::ObjDealloc(_) => {
                self.up_next_dealloc(node)
            }
            ConstructKind::Stmt(stmt) => self.up_next_stmt(node, &stmt),
        }
    }

    // ==================================================================
    // exec_step: exactly one atomic unit of visible work

    pub(crate) fn exec_step(&mut self, node: NodeId) {
        let construct = self.nodes[node].construct;
        match self.program.constructs[construct].kind.clone() {
            ConstructKind::Expr(e) => self.exec_expr(node, &e.kind, &e.ty),
            ConstructKind::Call(fc) => self.exec_call(node, &fc),
            ConstructKind::Init(init) => self.exec_init(node, &init),
            ConstructKind::TempDealloc(_) | ConstructKind::ObjDealloc(_) => {
                self.exec_dealloc(node)
            }
            ConstructKind::Stmt(stmt) => self.exec_stmt(node, &stmt),
        }
    }

    // ==================================================================
    // Expressions

    /// Operands of an expression in evaluation order (left-to-right where
    /// the order is otherwise unspecified)
    fn expr_operands(kind: &ExprKind) -> Vec<ConstructId> {
        match kind {
            ExprKind::Unary { operand, .. } => vec![*operand],
            ExprKind::Binary { lhs, rhs, .. } => vec![*lhs, *rhs],
            ExprKind::Assignment { lhs, rhs } => vec![*lhs, *rhs],
            ExprKind::Comma { lhs, rhs } => vec![*lhs, *rhs],
            ExprKind::Subscript { target, index } => vec![*target, *index],
            ExprKind::MemberAccess { object, .. } => vec![*object],
            ExprKind::Conversion { operand, .. } => vec![*operand],
            ExprKind::MaterializeTemporary { operand, .. } => vec![*operand],
            ExprKind::Call(call) => vec![*call],
            _ => Vec::new(),
        }
    }

    fn up_next_expr(&mut self, node: NodeId, kind: &ExprKind) -> bool {
        let frame = self.nodes[node].frame;
        let state = match self.nodes[node].state {
            RtState::Expr(s) => s,
            _ => unreachable!(),
        };
        match kind {
            // Short-circuit: the right operand is pushed only when the left
            // one does not already decide the result.
            ExprKind::Logical { op, lhs, rhs } => match state {
                ExprState::Start => {
                    self.nodes[node].state = RtState::Expr(ExprState::Operand(1));
                    self.spawn(*lhs, node, frame);
                    true
                }
                ExprState::Operand(1) => {
                    let (value, _) = self.consume(self.child(node, 0));
                    let decided = match op {
                        LogicalOp::And => value.as_bool() == Some(false),
                        LogicalOp::Or => value.as_bool() == Some(true),
                    };
                    self.nodes[node].state = RtState::Expr(ExprState::Operand(2));
                    if decided {
                        self.nodes[node].state = RtState::Expr(ExprState::Operate);
                        return false;
                    }
                    self.spawn(*rhs, node, frame);
                    true
                }
                ExprState::Operand(_) => {
                    self.nodes[node].state = RtState::Expr(ExprState::Operate);
                    false
                }
                ExprState::Operate => false,
            },
            ExprKind::Ternary {
                condition,
                then_expr,
                else_expr,
            } => match state {
                ExprState::Start => {
                    self.nodes[node].state = RtState::Expr(ExprState::Operand(1));
                    self.spawn(*condition, node, frame);
                    true
                }
                ExprState::Operand(1) => {
                    let (value, _) = self.consume(self.child(node, 0));
                    let branch = if value.as_bool() == Some(true) {
                        *then_expr
                    } else {
                        *else_expr
                    };
                    self.nodes[node].state = RtState::Expr(ExprState::Operand(2));
                    self.spawn(branch, node, frame);
                    true
                }
                ExprState::Operand(_) => {
                    self.nodes[node].state = RtState::Expr(ExprState::Operate);
                    false
                }
                ExprState::Operate => false,
            },
            _ => {
                let operands = Self::expr_operands(kind);
                match state {
                    ExprState::Start | ExprState::Operand(_) => {
                        let next = match state {
                            ExprState::Start => 0,
                            ExprState::Operand(i) => i,
                            _ => unreachable!(),
                        };
                        if next < operands.len() {
                            self.nodes[node].state = RtState::Expr(ExprState::Operand(next + 1));
                            self.spawn(operands[next], node, frame);
                            true
                        } else {
                            self.nodes[node].state = RtState::Expr(ExprState::Operate);
                            false
                        }
                    }
                    ExprState::Operate => false,
                }
            }
        }
    }

    fn exec_expr(&mut self, node: NodeId, kind: &ExprKind, ty: &Type) {
        let construct = self.nodes[node].construct;
        let frame = self.nodes[node].frame;
        let result = match kind {
            ExprKind::IntLiteral(v) => RtValue::Value {
                value: Value::Int(*v),
                valid: true,
            },
            ExprKind::DoubleLiteral(v) => RtValue::Value {
                value: Value::Double(*v),
                valid: true,
            },
            ExprKind::CharLiteral(c) => RtValue::Value {
                value: Value::Char(*c),
                valid: true,
            },
            ExprKind::BoolLiteral(b) => RtValue::Value {
                value: Value::Bool(*b),
                valid: true,
            },
            ExprKind::NullptrLiteral => RtValue::Value {
                value: Value::Ptr(PointerValue::Null),
                valid: true,
            },
            ExprKind::StringLiteral(s) => {
                let id = self.memory.string_literal(s, &self.program.symbols);
                RtValue::Object(id)
            }
            ExprKind::Identifier(entity) => {
                let object = self
                    .memory
                    .resolve(frame, *entity, &self.program.symbols)
                    .expect("identifier designates no object in this frame");
                RtValue::Object(object)
            }
            ExprKind::Unary { op, .. } => {
                let operand = self.child(node, 0);
                self.eval_unary(construct, *op, operand)
            }
            ExprKind::Binary { op, .. } => {
                let lhs = self.child(node, 0);
                let rhs = self.child(node, 1);
                self.eval_binary(construct, *op, lhs, rhs)
            }
            ExprKind::Logical { .. } => {
                // The last evaluated operand already carries the result:
                // short-circuiting stopped exactly when it was decided.
                let last = *self.nodes[node].children.last().expect("logical operand");
                let (value, valid) = self.consume(last);
                RtValue::Value { value, valid }
            }
            ExprKind::Assignment { .. } => {
                let target = self.object_of(self.child(node, 0));
                let (value, _) = self.consume(self.child(node, 1));
                let outcome = self.memory.write_value(target, value);
                if outcome.lifetime_violation {
                    self.emit_ub(construct, UbReason::WriteDeadObject);
                }
                RtValue::Object(target)
            }
            ExprKind::Comma { .. } | ExprKind::Ternary { .. } => {
                let last = *self.nodes[node].children.last().expect("operand");
                self.result_of(last)
            }
            ExprKind::Subscript { .. } => {
                let (target, valid) = self.consume(self.child(node, 0));
                let (index, _) = self.consume(self.child(node, 1));
                let pointer = target.as_pointer().unwrap_or(PointerValue::Invalid);
                let offset = index.integral().unwrap_or(0);
                let pointer = if valid {
                    self.pointer_offset(construct, pointer, offset)
                } else {
                    PointerValue::Invalid
                };
                match self.dereference(construct, pointer) {
                    Some(object) => RtValue::Object(object),
                    None => return, // crashed
                }
            }
            ExprKind::MemberAccess { member, .. } => {
                let object = self.object_of(self.child(node, 0));
                let resolved = match &self.program.symbols.entity(*member).kind {
                    EntityKind::MemberObject { class, index } => {
                        self.memory.resolve_member(object, *class, *index)
                    }
                    EntityKind::MemberReference { .. } => {
                        self.memory.member_binding(object, *member)
                    }
                    _ => None,
                };
                RtValue::Object(resolved.unwrap_or_else(|| self.memory.invalid_object()))
            }
            ExprKind::Call(_) => {
                let call = self.child(node, 0);
                match self.nodes[call].result.clone() {
                    Some(result) => result,
                    None => RtValue::Value {
                        value: Value::Uninitialized,
                        valid: false,
                    },
                }
            }
            ExprKind::Conversion { conv, .. } => {
                let operand = self.child(node, 0);
                self.apply_conversion(construct, *conv, operand, ty)
            }
            ExprKind::MaterializeTemporary { temp, .. } => {
                let (value, _) = self.consume(self.child(node, 0));
                let entity = &self.program.symbols.entities[*temp];
                let object = self.memory.allocate(
                    &entity.name,
                    &entity.ty,
                    StorageKind::Temporary,
                    &self.program.symbols,
                );
                self.memory.begin_lifetime(object);
                self.memory.write_value(object, value);
                self.memory
                    .frame_mut(frame)
                    .temporaries
                    .insert(*temp, object);
                self.emit(SimEvent::ObjectInitialized {
                    object,
                    storage: StorageKind::Temporary,
                });
                RtValue::Object(object)
            }
            ExprKind::Auxiliary | ExprKind::Unresolved => {
                unreachable!("auxiliary and unresolved expressions never reach the runtime")
            }
        };
        self.nodes[node].result = Some(result);
        self.nodes[node].done = true;
    }

    fn eval_unary(&mut self, construct: ConstructId, op: UnaryOp, operand: NodeId) -> RtValue {
        match op {
            UnaryOp::Neg => {
                let (value, valid) = self.consume(operand);
                let value = match value {
                    Value::Int(n) => Value::Int(n.wrapping_neg()),
                    Value::SizeT(n) => Value::SizeT(n.wrapping_neg()),
                    Value::Float(f) => Value::Float(-f),
                    Value::Double(d) => Value::Double(-d),
                    _ => Value::Uninitialized,
                };
                let valid = valid && value.is_initialized();
                RtValue::Value { value, valid }
            }
            UnaryOp::Not => {
                let (value, valid) = self.consume(operand);
                RtValue::Value {
                    value: Value::Bool(value.as_bool() == Some(false)),
                    valid,
                }
            }
            UnaryOp::Deref => {
                let (value, valid) = self.consume(operand);
                let pointer = if valid {
                    value.as_pointer().unwrap_or(PointerValue::Invalid)
                } else {
                    PointerValue::Invalid
                };
                match self.dereference(construct, pointer) {
                    Some(object) => RtValue::Object(object),
                    None => {
                        // Crashed on a null dereference; the node still
                        // records a poison result for consistency.
                        RtValue::Object(self.memory.invalid_object())
                    }
                }
            }
            UnaryOp::AddrOf => {
                let object = self.object_of(operand);
                RtValue::Value {
                    value: Value::Ptr(self.pointer_to(object)),
                    valid: true,
                }
            }
        }
    }

    /// The pointer value designating `object`: elements of arrays become
    /// array-element pointers so arithmetic on them stays checkable
    fn pointer_to(&self, object: ObjectId) -> PointerValue {
        if let Some(parent) = self.memory.object(object).containing {
            if let ObjectData::Array { elements } = &self.memory.object(parent).data {
                if let Some(index) = elements.iter().position(|&e| e == object) {
                    return PointerValue::ArrayElement {
                        array: parent,
                        index: index as i64,
                    };
                }
            }
        }
        PointerValue::ToObject(object)
    }

    /// Move a pointer by `n` elements, reporting undefined behavior when the
    /// result leaves the array (one past the end is allowed)
    fn pointer_offset(
        &mut self,
        construct: ConstructId,
        pointer: PointerValue,
        n: i64,
    ) -> PointerValue {
        match pointer {
            _ if n == 0 => pointer,
            PointerValue::Null | PointerValue::Invalid => {
                self.emit_ub(construct, UbReason::InvalidPointer);
                PointerValue::Invalid
            }
            PointerValue::ToObject(_) => {
                self.emit_ub(construct, UbReason::PointerArithmeticOutOfBounds);
                PointerValue::Invalid
            }
            PointerValue::ArrayElement { array, index } => {
                let len = self.memory.object(array).elements().len() as i64;
                let moved = index + n;
                if (0..=len).contains(&moved) {
                    PointerValue::ArrayElement {
                        array,
                        index: moved,
                    }
                } else {
                    self.emit_ub(construct, UbReason::PointerArithmeticOutOfBounds);
                    PointerValue::Invalid
                }
            }
        }
    }

    /// The object a pointer designates. `None` means the simulation crashed
    /// (null dereference); invalid and past-the-end pointers yield the
    /// poison object plus an undefined-behavior event.
    fn dereference(&mut self, construct: ConstructId, pointer: PointerValue) -> Option<ObjectId> {
        match pointer {
            PointerValue::Null => {
                self.emit(SimEvent::Crash {
                    construct,
                    reason: CrashReason::NullPointerDereference,
                });
                None
            }
            PointerValue::Invalid => {
                self.emit_ub(construct, UbReason::InvalidPointer);
                Some(self.memory.invalid_object())
            }
            PointerValue::ToObject(object) => Some(object),
            PointerValue::ArrayElement { array, index } => {
                let elements = self.memory.object(array).elements();
                if index >= 0 && (index as usize) < elements.len() {
                    Some(elements[index as usize])
                } else {
                    self.emit_ub(construct, UbReason::DereferenceOutOfBounds);
                    Some(self.memory.invalid_object())
                }
            }
        }
    }

    /// Display address of a pointer, for relational comparison
    fn pointer_address(&self, pointer: PointerValue) -> Option<(ObjectId, u64)> {
        match pointer {
            PointerValue::Null | PointerValue::Invalid => None,
            PointerValue::ToObject(o) => Some((o, self.memory.object(o).address)),
            PointerValue::ArrayElement { array, index } => {
                let a = self.memory.object(array);
                let elem_size = match &a.ty.kind {
                    TypeKind::BoundedArray(elem, _) => {
                        elem.size_of(&self.program.symbols) as u64
                    }
                    _ => 1,
                };
                Some((array, a.address + index.max(0) as u64 * elem_size))
            }
        }
    }

    fn eval_binary(
        &mut self,
        construct: ConstructId,
        op: BinaryOp,
        lhs: NodeId,
        rhs: NodeId,
    ) -> RtValue {
        let (lv, lvalid) = self.consume(lhs);
        let (rv, rvalid) = self.consume(rhs);
        let valid = lvalid && rvalid;

        // Pointer forms first.
        let lptr = lv.as_pointer();
        let rptr = rv.as_pointer();
        if lptr.is_some() || rptr.is_some() {
            return self.eval_pointer_binary(construct, op, lv, rv, valid);
        }

        if !valid {
            return RtValue::Value {
                value: Value::Uninitialized,
                valid: false,
            };
        }

        let value = match (&lv, &rv) {
            (Value::Double(a), Value::Double(b)) => eval_float_op(op, *a, *b),
            (Value::Float(a), Value::Float(b)) => {
                match eval_float_op(op, *a as f64, *b as f64) {
                    Value::Double(d) => Value::Float(d as f32),
                    other => other,
                }
            }
            (Value::SizeT(a), Value::SizeT(b)) => {
                match self.eval_int_op(construct, op, *a as i64, *b as i64) {
                    Some(Value::Int(n)) => Value::SizeT(n as u64),
                    Some(other) => other,
                    None => {
                        return RtValue::Value {
                            value: Value::Uninitialized,
                            valid: false,
                        }
                    }
                }
            }
            _ => {
                let (a, b) = match (lv.integral(), rv.integral()) {
                    (Some(a), Some(b)) => (a, b),
                    _ => {
                        return RtValue::Value {
                            value: Value::Uninitialized,
                            valid: false,
                        }
                    }
                };
                match self.eval_int_op(construct, op, a, b) {
                    Some(v) => v,
                    None => {
                        return RtValue::Value {
                            value: Value::Uninitialized,
                            valid: false,
                        }
                    }
                }
            }
        };
        RtValue::Value { value, valid: true }
    }

    /// Integer arithmetic; `None` reports division by zero (already emitted)
    fn eval_int_op(
        &mut self,
        construct: ConstructId,
        op: BinaryOp,
        a: i64,
        b: i64,
    ) -> Option<Value> {
        Some(match op {
            BinaryOp::Add => Value::Int(a.wrapping_add(b)),
            BinaryOp::Sub => Value::Int(a.wrapping_sub(b)),
            BinaryOp::Mul => Value::Int(a.wrapping_mul(b)),
            BinaryOp::Div => {
                if b == 0 {
                    self.emit_ub(construct, UbReason::DivisionByZero);
                    return None;
                }
                Value::Int(a.wrapping_div(b))
            }
            BinaryOp::Mod => {
                if b == 0 {
                    self.emit_ub(construct, UbReason::DivisionByZero);
                    return None;
                }
                Value::Int(a.wrapping_rem(b))
            }
            BinaryOp::Eq => Value::Bool(a == b),
            BinaryOp::Ne => Value::Bool(a != b),
            BinaryOp::Lt => Value::Bool(a < b),
            BinaryOp::Le => Value::Bool(a <= b),
            BinaryOp::Gt => Value::Bool(a > b),
            BinaryOp::Ge => Value::Bool(a >= b),
        })
    }

    fn eval_pointer_binary(
        &mut self,
        construct: ConstructId,
        op: BinaryOp,
        lv: Value,
        rv: Value,
        valid: bool,
    ) -> RtValue {
        if !valid {
            return RtValue::Value {
                value: Value::Uninitialized,
                valid: false,
            };
        }
        match op {
            BinaryOp::Add => {
                let (pointer, offset) = match (lv.as_pointer(), rv.integral()) {
                    (Some(p), Some(n)) => (p, n),
                    _ => match (rv.as_pointer(), lv.integral()) {
                        (Some(p), Some(n)) => (p, n),
                        _ => (PointerValue::Invalid, 0),
                    },
                };
                let moved = self.pointer_offset(construct, pointer, offset);
                RtValue::Value {
                    value: Value::Ptr(moved),
                    valid: moved != PointerValue::Invalid,
                }
            }
            BinaryOp::Sub => match (lv.as_pointer(), rv.as_pointer()) {
                (Some(a), Some(b)) => match (a, b) {
                    (
                        PointerValue::ArrayElement { array: aa, index: ai },
                        PointerValue::ArrayElement { array: ba, index: bi },
                    ) if aa == ba => RtValue::Value {
                        value: Value::Int(ai - bi),
                        valid: true,
                    },
                    _ => {
                        self.emit_ub(construct, UbReason::UnrelatedPointerSubtraction);
                        RtValue::Value {
                            value: Value::Uninitialized,
                            valid: false,
                        }
                    }
                },
                _ => {
                    let pointer = lv.as_pointer().unwrap_or(PointerValue::Invalid);
                    let offset = rv.integral().unwrap_or(0);
                    let moved = self.pointer_offset(construct, pointer, -offset);
                    RtValue::Value {
                        value: Value::Ptr(moved),
                        valid: moved != PointerValue::Invalid,
                    }
                }
            },
            BinaryOp::Eq | BinaryOp::Ne => {
                let a = lv.as_pointer().unwrap_or(PointerValue::Invalid);
                let b = rv.as_pointer().unwrap_or(PointerValue::Invalid);
                let equal = match (self.pointer_address(a), self.pointer_address(b)) {
                    (None, None) => a == PointerValue::Null && b == PointerValue::Null,
                    (Some((_, x)), Some((_, y))) => x == y,
                    _ => false,
                };
                RtValue::Value {
                    value: Value::Bool(if op == BinaryOp::Eq { equal } else { !equal }),
                    valid: true,
                }
            }
            _ => {
                let a = lv.as_pointer().unwrap_or(PointerValue::Invalid);
                let b = rv.as_pointer().unwrap_or(PointerValue::Invalid);
                match (self.pointer_address(a), self.pointer_address(b)) {
                    (Some((ao, x)), Some((bo, y))) => {
                        if ao != bo {
                            self.emit(SimEvent::UnspecifiedBehavior {
                                construct,
                                reason: UnspecifiedReason::UnrelatedPointerComparison,
                            });
                        }
                        let result = match op {
                            BinaryOp::Lt => x < y,
                            BinaryOp::Le => x <= y,
                            BinaryOp::Gt => x > y,
                            BinaryOp::Ge => x >= y,
                            _ => unreachable!(),
                        };
                        RtValue::Value {
                            value: Value::Bool(result),
                            valid: true,
                        }
                    }
                    _ => {
                        self.emit_ub(construct, UbReason::InvalidPointer);
                        RtValue::Value {
                            value: Value::Uninitialized,
                            valid: false,
                        }
                    }
                }
            }
        }
    }

    fn apply_conversion(
        &mut self,
        construct: ConstructId,
        conv: Conversion,
        operand: NodeId,
        target: &Type,
    ) -> RtValue {
        match conv {
            Conversion::LvalueToRvalue => {
                let object = self.object_of(operand);
                let outcome = self.memory.read_value(object);
                if outcome.lifetime_violation {
                    self.emit_ub(construct, UbReason::ReadDeadObject);
                } else if !outcome.valid {
                    self.emit_ub(construct, UbReason::ReadUninitialized);
                }
                RtValue::Value {
                    value: outcome.value,
                    valid: outcome.valid,
                }
            }
            Conversion::ArrayToPointer => {
                let array = self.object_of(operand);
                RtValue::Value {
                    value: Value::Ptr(PointerValue::ArrayElement { array, index: 0 }),
                    valid: true,
                }
            }
            Conversion::FunctionToPointer => RtValue::Value {
                value: Value::Ptr(PointerValue::Invalid),
                valid: false,
            },
            Conversion::Qualification => {
                let (value, valid) = self.consume(operand);
                RtValue::Value { value, valid }
            }
            Conversion::NullPointer => RtValue::Value {
                value: Value::Ptr(PointerValue::Null),
                valid: true,
            },
            Conversion::PointerToBool => {
                let (value, valid) = self.consume(operand);
                RtValue::Value {
                    value: Value::Bool(value.as_pointer() != Some(PointerValue::Null)),
                    valid,
                }
            }
            Conversion::DerivedToBase => {
                let (value, valid) = self.consume(operand);
                let converted = match value.as_pointer() {
                    Some(PointerValue::ToObject(o)) => {
                        let base = match &self.memory.object(o).data {
                            ObjectData::Class { base, .. } => *base,
                            _ => None,
                        };
                        match base {
                            Some(b) => Value::Ptr(PointerValue::ToObject(b)),
                            None => Value::Ptr(PointerValue::Invalid),
                        }
                    }
                    Some(PointerValue::Null) => Value::Ptr(PointerValue::Null),
                    _ => Value::Ptr(PointerValue::Invalid),
                };
                RtValue::Value {
                    value: converted,
                    valid,
                }
            }
            Conversion::IntegralPromotion
            | Conversion::IntegralConversion
            | Conversion::FloatingToIntegral => {
                let (value, valid) = self.consume(operand);
                let n = match value {
                    Value::Float(f) => f as i64,
                    Value::Double(d) => d as i64,
                    other => other.integral().unwrap_or(0),
                };
                let converted = match &target.kind {
                    TypeKind::Bool => Value::Bool(n != 0),
                    TypeKind::Char => Value::Char(n as i8),
                    TypeKind::SizeT => Value::SizeT(n as u64),
                    _ => Value::Int(n),
                };
                RtValue::Value {
                    value: converted,
                    valid,
                }
            }
            Conversion::IntegralToFloating => {
                let (value, valid) = self.consume(operand);
                let n = value.integral().unwrap_or(0);
                let converted = match &target.kind {
                    TypeKind::Float => Value::Float(n as f32),
                    _ => Value::Double(n as f64),
                };
                RtValue::Value {
                    value: converted,
                    valid,
                }
            }
            Conversion::FloatingPromotion => {
                let (value, valid) = self.consume(operand);
                let d = value.floating().unwrap_or(0.0);
                RtValue::Value {
                    value: Value::Double(d),
                    valid,
                }
            }
            Conversion::FloatingConversion => {
                let (value, valid) = self.consume(operand);
                let d = value.floating().unwrap_or(0.0);
                RtValue::Value {
                    value: Value::Float(d as f32),
                    valid,
                }
            }
        }
    }

    // ==================================================================
    // Function calls: PUSH → ARGUMENTS → CALL → RETURN

    fn up_next_call(&mut self, node: NodeId, fc: &crate::constructs::FunctionCall) -> bool {
        let frame = self.nodes[node].frame;
        let state = match self.nodes[node].state {
            RtState::Call(s) => s,
            _ => unreachable!(),
        };
        match state {
            CallState::Receiver => {
                if let Some(receiver) = fc.receiver {
                    if self.nodes[node].children.is_empty() {
                        self.spawn(receiver, node, frame);
                        return true;
                    }
                }
                self.nodes[node].state = RtState::Call(CallState::Push);
                false
            }
            CallState::Push => false,
            CallState::Arguments(i) => {
                if i < fc.arg_inits.len() {
                    let callee = self.nodes[node].callee_frame.expect("frame pushed");
                    let init_construct = fc.arg_inits[i];
                    let target = self.initializer_target(init_construct);
                    // Argument expressions evaluate in the caller's frame;
                    // the parameter they initialize lives in the callee's.
                    let child = self.spawn(init_construct, node, frame);
                    self.nodes[child].target_frame = Some(callee);
                    self.nodes[child].target_object =
                        self.memory.resolve(callee, target, &self.program.symbols);
                    self.nodes[node].state = RtState::Call(CallState::Arguments(i + 1));
                    true
                } else {
                    false
                }
            }
            CallState::Body(j) => {
                let items = self.call_body_items(fc.function);
                if j < items.len() {
                    let callee = self.nodes[node].callee_frame.expect("frame pushed");
                    self.nodes[node].state = RtState::Call(CallState::Body(j + 1));
                    self.spawn(items[j], node, callee);
                    true
                } else {
                    false
                }
            }
        }
    }

    /// Constructor member initializers, the body block, and (for
    /// destructors) the member cleanup, in execution order. Empty for the
    /// builtin `assert`.
    fn call_body_items(&self, function: EntityId) -> Vec<ConstructId> {
        match self.program.functions.get(&function) {
            None => Vec::new(),
            Some(compiled) => {
                let mut items = compiled.member_inits.clone();
                items.push(compiled.body);
                items.extend(compiled.member_dealloc);
                items
            }
        }
    }

    fn initializer_target(&self, init: ConstructId) -> EntityId {
        match &self.program.constructs[init].kind {
            ConstructKind::Init(i) => i.target,
            _ => panic!("argument list entry is not an initializer"),
        }
    }

    fn exec_call(&mut self, node: NodeId, fc: &crate::constructs::FunctionCall) {
        let construct = self.nodes[node].construct;
        let caller = self.nodes[node].frame;
        let state = match self.nodes[node].state {
            RtState::Call(s) => s,
            _ => unreachable!(),
        };
        match state {
            CallState::Push => {
                let callee = self.memory.push_frame(fc.function);
                self.nodes[node].callee_frame = Some(callee);

                let receiver = if fc.receiver.is_some() {
                    Some(self.object_of(self.child(node, 0)))
                } else {
                    self.nodes[node].target_object
                };
                self.memory.frame_mut(callee).receiver = receiver;

                // Parameter storage: one object per by-value parameter,
                // registered under the call-site entity (and later aliased
                // to the definition's named parameter).
                for &init in &fc.arg_inits {
                    let target = self.initializer_target(init);
                    let entity = &self.program.symbols.entities[target];
                    if entity.is_reference_entity() {
                        continue;
                    }
                    let object = self.memory.allocate(
                        &entity.name,
                        &entity.ty,
                        StorageKind::Automatic,
                        &self.program.symbols,
                    );
                    self.memory
                        .frame_mut(callee)
                        .locals
                        .insert(target, object);
                }

                // Return slot: a temporary in the caller's frame, aliased as
                // the callee's return object.
                if let Some(slot) = fc.return_slot {
                    let entity = &self.program.symbols.entities[slot];
                    let object = self.memory.allocate(
                        &entity.name,
                        &entity.ty,
                        StorageKind::Temporary,
                        &self.program.symbols,
                    );
                    self.memory
                        .frame_mut(caller)
                        .temporaries
                        .insert(slot, object);
                    self.memory.frame_mut(callee).return_object = Some(object);
                }
                self.nodes[node].state = RtState::Call(CallState::Arguments(0));
            }
            CallState::Arguments(_) => {
                // CALL transition: alias call-site parameter entities to the
                // definition's named parameters, then hand control over.
                let callee = self.nodes[node].callee_frame.expect("frame pushed");
                if let Some(compiled) = self.program.functions.get(&fc.function) {
                    let named = compiled.params.clone();
                    for (&init, &named_entity) in fc.arg_inits.iter().zip(&named) {
                        let target = self.initializer_target(init);
                        if let Some(&object) =
                            self.memory.frame(callee).locals.get(&target)
                        {
                            self.memory
                                .frame_mut(callee)
                                .locals
                                .insert(named_entity, object);
                        } else if let Some(&bound) =
                            self.memory.frame(callee).bindings.get(&target)
                        {
                            self.memory
                                .frame_mut(callee)
                                .bindings
                                .insert(named_entity, bound);
                        }
                    }
                }
                self.emit(SimEvent::Called {
                    function: fc.function,
                });

                let info = self.program.symbols.entity(fc.function).function_info();
                if info.kind == FunctionKind::BuiltinAssert {
                    let target = self.initializer_target(fc.arg_inits[0]);
                    let holds = self
                        .memory
                        .resolve(callee, target, &self.program.symbols)
                        .map(|o| self.memory.read_value(o).value)
                        .and_then(|v| v.as_bool())
                        .unwrap_or(false);
                    if !holds {
                        self.emit(SimEvent::AssertionFailure { construct });
                    }
                }
                self.nodes[node].state = RtState::Call(CallState::Body(0));
            }
            CallState::Body(_) => {
                // RETURN transition: callee loses control before the caller
                // regains it.
                self.emit(SimEvent::Returned {
                    function: fc.function,
                });
                let popped = self.memory.pop_frame();
                let result = if let Some(slot) = fc.return_slot {
                    let object = self
                        .memory
                        .frame(caller)
                        .temporaries
                        .get(&slot)
                        .copied()
                        .expect("return slot allocated at frame push");
                    RtValue::Object(object)
                } else {
                    let return_type = &self
                        .program
                        .symbols
                        .entity(fc.function)
                        .function_info()
                        .signature
                        .return_type;
                    if return_type.is_reference() {
                        RtValue::Object(
                            popped
                                .return_binding
                                .unwrap_or_else(|| self.memory.invalid_object()),
                        )
                    } else {
                        RtValue::Value {
                            value: Value::Uninitialized,
                            valid: false,
                        }
                    }
                };
                self.nodes[node].result = Some(result);
                self.nodes[node].done = true;
            }
            CallState::Receiver => unreachable!("receiver phase never executes a step"),
        }
    }

    // ==================================================================
    // Initializers

    fn up_next_init(&mut self, node: NodeId, init: &Initializer) -> bool {
        let frame = self.nodes[node].frame;
        let state = match self.nodes[node].state {
            RtState::Init(s) => s,
            _ => unreachable!(),
        };
        match (&init.kind, state) {
            (InitKind::AtomicDirect { source }, InitState::Start)
            | (InitKind::ReferenceBind { source }, InitState::Start) => {
                self.nodes[node].state = RtState::Init(InitState::Source);
                self.spawn(*source, node, frame);
                true
            }
            (InitKind::ArrayFromStringLiteral { literal }, InitState::Start) => {
                self.nodes[node].state = RtState::Init(InitState::Source);
                self.spawn(*literal, node, frame);
                true
            }
            (InitKind::ArrayAggregate { elem_inits }, InitState::Began(i)) => {
                if i < elem_inits.len() {
                    let array = self.nodes[node]
                        .target_object
                        .expect("aggregate initializer target injected");
                    let element = self.memory.object(array).elements()[i];
                    let child = self.spawn(elem_inits[i], node, frame);
                    self.nodes[child].target_object = Some(element);
                    self.nodes[node].state = RtState::Init(InitState::Began(i + 1));
                    true
                } else {
                    false
                }
            }
            (InitKind::ClassConstructor { call }, InitState::Began(0)) => {
                let receiver = self.nodes[node].target_object;
                let child = self.spawn(*call, node, frame);
                self.nodes[child].target_object = receiver;
                self.nodes[node].state = RtState::Init(InitState::Began(1));
                true
            }
            _ => false,
        }
    }

    fn exec_init(&mut self, node: NodeId, init: &Initializer) {
        let frame = self.nodes[node].frame;
        let state = match self.nodes[node].state {
            RtState::Init(s) => s,
            _ => unreachable!(),
        };
        let target_object = self.nodes[node].target_object;
        match (&init.kind, state) {
            (InitKind::AtomicDefault, InitState::Start) => {
                let object = target_object.expect("initializer target injected");
                self.memory.begin_lifetime(object);
                self.finish_object_init(node, object);
            }
            (InitKind::AtomicValue, InitState::Start) => {
                let object = target_object.expect("initializer target injected");
                self.memory.begin_lifetime(object);
                let zero = Value::zero_like(&self.memory.object(object).ty.clone());
                self.memory.write_value(object, zero);
                self.finish_object_init(node, object);
            }
            (InitKind::AtomicDirect { .. }, InitState::Source) => {
                let object = target_object.expect("initializer target injected");
                let (value, _) = self.consume(self.child(node, 0));
                self.memory.begin_lifetime(object);
                self.memory.write_value(object, value);
                self.finish_object_init(node, object);
            }
            (InitKind::ReferenceBind { .. }, InitState::Source) => {
                let bound = self.object_of(self.child(node, 0));
                let bind_frame = self.nodes[node].target_frame.unwrap_or(frame);
                self.memory
                    .bind_reference(bind_frame, init.target, bound, &self.program.symbols);
                self.emit(SimEvent::ReferenceInitialized {
                    entity: init.target,
                    object: bound,
                });
                self.nodes[node].result = Some(RtValue::Object(bound));
                self.nodes[node].done = true;
            }
            (InitKind::ArrayFromStringLiteral { .. }, InitState::Source) => {
                let object = target_object.expect("initializer target injected");
                let literal = self.object_of(self.child(node, 0));
                let chars: Vec<Value> = self
                    .memory
                    .object(literal)
                    .elements()
                    .iter()
                    .map(|&e| self.memory.read_value(e).value)
                    .collect();
                self.memory.begin_lifetime(object);
                let elements = self.memory.object(object).elements().to_vec();
                for (i, &element) in elements.iter().enumerate() {
                    self.memory.begin_lifetime(element);
                    let value = chars.get(i).cloned().unwrap_or(Value::Char(0));
                    self.memory.write_value(element, value);
                }
                self.finish_object_init(node, object);
            }
            (InitKind::ArrayAggregate { .. }, InitState::Start)
            | (InitKind::ClassConstructor { .. }, InitState::Start) => {
                let object = target_object.expect("initializer target injected");
                self.memory.begin_lifetime(object);
                self.nodes[node].state = RtState::Init(InitState::Began(0));
            }
            (InitKind::ArrayAggregate { .. }, InitState::Began(_))
            | (InitKind::ClassConstructor { .. }, InitState::Began(_)) => {
                let object = target_object.expect("initializer target injected");
                self.finish_object_init(node, object);
            }
            (InitKind::IllFormed, _) => {
                unreachable!("ill-formed initializers never reach the runtime")
            }
            other => unreachable!("initializer in impossible state: {:?}", other.1),
        }
    }

    fn finish_object_init(&mut self, node: NodeId, object: ObjectId) {
        let storage = self.memory.object(object).storage;
        self.emit(SimEvent::ObjectInitialized { object, storage });
        self.nodes[node].result = Some(RtValue::Object(object));
        self.nodes[node].done = true;
    }

    // ==================================================================
    // Deallocators

    /// The destruction list (in registration/declaration order; execution
    /// reverses it) and the per-entry destructor calls
    fn dealloc_parts(&self, construct: ConstructId) -> (Vec<EntityId>, Vec<Option<ConstructId>>) {
        match &self.program.constructs[construct].kind {
            ConstructKind::TempDealloc(td) => {
                (td.temporaries.clone(), td.destructor_calls.clone())
            }
            ConstructKind::ObjDealloc(od) => (od.objects.clone(), od.destructor_calls.clone()),
            _ => panic!("not a deallocator construct"),
        }
    }

    /// Resolve the entity a deallocator is about to destroy; temporaries
    /// that were never materialized resolve to nothing and are skipped
    fn dealloc_resolve(&self, construct: ConstructId, frame: usize, entity: EntityId) -> Option<ObjectId> {
        match &self.program.constructs[construct].kind {
            ConstructKind::TempDealloc(_) => {
                self.memory.frame(frame).temporaries.get(&entity).copied()
            }
            _ => self.memory.resolve(frame, entity, &self.program.symbols),
        }
    }

    fn up_next_dealloc(&mut self, node: NodeId) -> bool {
        let construct = self.nodes[node].construct;
        let frame = self.nodes[node].frame;
        let (entities, destructor_calls) = self.dealloc_parts(construct);
        let state = match self.nodes[node].state {
            RtState::Dealloc(s) => s,
            _ => unreachable!(),
        };
        match state {
            DeallocState::Cursor(mut j) => {
                // Reverse order; entries whose object never existed are
                // skipped without a visible step.
                while j < entities.len() {
                    let index = entities.len() - 1 - j;
                    match self.dealloc_resolve(construct, frame, entities[index]) {
                        None => j += 1,
                        Some(object) => {
                            self.nodes[node].target_object = Some(object);
                            self.nodes[node].state = RtState::Dealloc(DeallocState::Destroy(j));
                            if let Some(call) = destructor_calls[index] {
                                let child = self.spawn(call, node, frame);
                                self.nodes[child].target_object = Some(object);
                                return true;
                            }
                            return false;
                        }
                    }
                }
                self.nodes[node].done = true;
                true
            }
            DeallocState::Destroy(_) => false,
        }
    }

    fn exec_dealloc(&mut self, node: NodeId) {
        let state = match self.nodes[node].state {
            RtState::Dealloc(s) => s,
            _ => unreachable!(),
        };
        let j = match state {
            DeallocState::Destroy(j) => j,
            DeallocState::Cursor(_) => unreachable!("cursor state never executes a step"),
        };
        let object = self.nodes[node]
            .target_object
            .expect("deallocator resolved its object");
        let storage = self.memory.object(object).storage;
        self.memory.kill(object);
        self.emit(SimEvent::ObjectDestroyed { object, storage });
        self.nodes[node].target_object = None;
        self.nodes[node].state = RtState::Dealloc(DeallocState::Cursor(j + 1));
    }

    // ==================================================================
    // Statements

    /// Child constructs of a statement in execution order
    fn stmt_items(stmt: &Statement) -> Vec<ConstructId> {
        match stmt {
            Statement::Expression { expr, temp_dealloc } => {
                let mut items = vec![*expr];
                items.extend(*temp_dealloc);
                items
            }
            Statement::Declaration {
                init, temp_dealloc, ..
            } => {
                let mut items = vec![*init];
                items.extend(*temp_dealloc);
                items
            }
            Statement::Return { init, temp_dealloc } => {
                let mut items = Vec::new();
                items.extend(*init);
                items.extend(*temp_dealloc);
                items
            }
            Statement::Block { stmts, dealloc } => {
                let mut items = stmts.clone();
                items.extend(*dealloc);
                items
            }
        }
    }

    fn up_next_stmt(&mut self, node: NodeId, stmt: &Statement) -> bool {
        let frame = self.nodes[node].frame;
        let state = match self.nodes[node].state {
            RtState::Stmt(s) => s,
            _ => unreachable!(),
        };
        let items = Self::stmt_items(stmt);
        match state {
            StmtState::Start => match stmt {
                // Declarations allocate storage in a visible step; returns
                // record their target first.
                Statement::Declaration { .. } | Statement::Return { .. } => false,
                _ => {
                    self.nodes[node].state = RtState::Stmt(StmtState::Item(0));
                    true
                }
            },
            StmtState::Item(mut i) => {
                // Once the frame has returned, the remaining statements of a
                // block are skipped; its deallocator still runs.
                if let Statement::Block { stmts, .. } = stmt {
                    if i < stmts.len() && self.memory.frame(frame).returned {
                        i = stmts.len();
                    }
                }
                if i < items.len() {
                    let child = self.spawn(items[i], node, frame);
                    if self.is_init_item(stmt, i) {
                        self.nodes[child].target_object = self.nodes[node].target_object;
                        self.nodes[child].target_frame = Some(frame);
                    }
                    self.nodes[node].state = RtState::Stmt(StmtState::Item(i + 1));
                    true
                } else if matches!(stmt, Statement::Return { .. }) {
                    self.nodes[node].state = RtState::Stmt(StmtState::Finish);
                    false
                } else {
                    self.nodes[node].done = true;
                    true
                }
            }
            StmtState::Finish => false,
        }
    }

    /// Whether item `i` of `stmt` is the statement's initializer (and must
    /// receive the statement's target injection)
    fn is_init_item(&self, stmt: &Statement, i: usize) -> bool {
        i == 0
            && matches!(
                stmt,
                Statement::Declaration { .. } | Statement::Return { init: Some(_), .. }
            )
    }

    fn exec_stmt(&mut self, node: NodeId, stmt: &Statement) {
        let frame = self.nodes[node].frame;
        let state = match self.nodes[node].state {
            RtState::Stmt(s) => s,
            _ => unreachable!(),
        };
        match (stmt, state) {
            (Statement::Declaration { entity, .. }, StmtState::Start) => {
                let target = match &self.program.symbols.entity(*entity).kind {
                    EntityKind::LocalObject => {
                        let data = self.program.symbols.entity(*entity).clone();
                        let object = self.memory.allocate(
                            &data.name,
                            &data.ty,
                            StorageKind::Automatic,
                            &self.program.symbols,
                        );
                        self.memory
                            .frame_mut(frame)
                            .locals
                            .insert(*entity, object);
                        Some(object)
                    }
                    EntityKind::LocalReference | EntityKind::MemberReference { .. } => None,
                    // Member and base subobjects already exist inside the
                    // receiver; find them.
                    _ => self.memory.resolve(frame, *entity, &self.program.symbols),
                };
                self.nodes[node].target_object = target;
                self.nodes[node].state = RtState::Stmt(StmtState::Item(0));
            }
            (Statement::Return { .. }, StmtState::Start) => {
                self.nodes[node].target_object = self.memory.frame(frame).return_object;
                self.nodes[node].state = RtState::Stmt(StmtState::Item(0));
            }
            (Statement::Return { init, .. }, StmtState::Finish) => {
                if let Some(init) = init {
                    // Reference returns record the bound object so the call
                    // can surface it after the frame is gone.
                    let target = self.initializer_target(*init);
                    if self.program.symbols.entity(target).ty.is_reference() {
                        let bound = self.memory.frame(frame).bindings.get(&target).copied();
                        self.memory.frame_mut(frame).return_binding = bound;
                    }
                }
                self.memory.frame_mut(frame).returned = true;
                self.nodes[node].done = true;
            }
            other => unreachable!("statement in impossible state: {:?}", other.1),
        }
    }
}

/// Floating-point arithmetic on a common `double` operand pair
fn eval_float_op(op: BinaryOp, a: f64, b: f64) -> Value {
    match op {
        BinaryOp::Add => Value::Double(a + b),
        BinaryOp::Sub => Value::Double(a - b),
        BinaryOp::Mul => Value::Double(a * b),
        BinaryOp::Div => Value::Double(a / b),
        BinaryOp::Mod => Value::Double(a % b),
        BinaryOp::Eq => Value::Bool(a == b),
        BinaryOp::Ne => Value::Bool(a != b),
        BinaryOp::Lt => Value::Bool(a < b),
        BinaryOp::Le => Value::Bool(a <= b),
        BinaryOp::Gt => Value::Bool(a > b),
        BinaryOp::Ge => Value::Bool(a >= b),
    }
}

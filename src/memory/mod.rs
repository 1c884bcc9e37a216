//! The memory model: objects, frames, and entity→object resolution
//!
//! This module provides the runtime storage abstractions:
//! - [`value`]: tagged runtime values and object-tracking pointers
//! - [`object`]: typed storage regions with explicit, monotone lifetime
//! - [`Memory`]: the object arena, the frame stack, and global storage
//!
//! # Type sizes
//!
//! Sizes are fixed and platform-independent: `bool` and `char` are 1 byte,
//! `int` and `float` 4, `size_t`, `double`, and pointers 8; arrays and
//! classes are the sum of their parts with no padding or alignment.
//! Addresses are assigned contiguously at allocation and exist for display
//! and pointer comparison only; storage is never addressed by raw bytes.
//!
//! # Undefined behavior
//!
//! Memory never panics on a program's misuse of its own storage. Reads and
//! writes report lifetime and validity violations through
//! [`ReadOutcome`]/[`WriteOutcome`], and the runtime turns them into
//! simulation events. Panics are reserved for engine bugs (resolving an
//! entity no frame defines, touching the slot of a non-atomic object).

pub mod object;
pub mod value;

use crate::entities::{EntityId, EntityKind, SymbolTable};
use crate::types::{ClassId, Type, TypeKind};
use object::{AtomicSlot, Lifetime, Object, ObjectData, StorageKind};
use rustc_hash::FxHashMap;
use tracing::trace;
use value::Value;

/// Memory address type (display and comparison only)
pub type Address = u64;

/// Stable object id: index into the memory's object arena
pub type ObjectId = usize;

/// Result of reading an atomic object
#[derive(Debug, Clone)]
pub struct ReadOutcome {
    pub value: Value,
    /// False when the value is indeterminate
    pub valid: bool,
    /// The object was not alive at the time of the read
    pub lifetime_violation: bool,
}

/// Result of writing an atomic object
#[derive(Debug, Clone, Copy)]
pub struct WriteOutcome {
    /// The object was not alive at the time of the write
    pub lifetime_violation: bool,
}

/// One logical stack frame
#[derive(Debug, Default)]
pub struct Frame {
    pub function: EntityId,
    /// Local and by-value parameter objects
    pub locals: FxHashMap<EntityId, ObjectId>,
    /// Reference bindings (locals and by-reference parameters)
    pub bindings: FxHashMap<EntityId, ObjectId>,
    /// Materialized temporaries of full expressions evaluated in this frame
    pub temporaries: FxHashMap<EntityId, ObjectId>,
    /// The callee's return object; lives in the *caller's* frame as a
    /// temporary, this is the callee-side alias
    pub return_object: Option<ObjectId>,
    /// Object a reference-returning function chose to return
    pub return_binding: Option<ObjectId>,
    /// Receiver object for methods, constructors, and destructors
    pub receiver: Option<ObjectId>,
    /// Set by a return statement; enclosing blocks skip their remaining
    /// statements but still run their deallocators
    pub returned: bool,
}

/// The object arena, frame stack, and global storage of one simulation
#[derive(Debug, Default)]
pub struct Memory {
    pub objects: Vec<Object>,
    next_address: Address,
    pub frames: Vec<Frame>,
    pub globals: FxHashMap<EntityId, ObjectId>,
    /// Reference members, keyed by (containing object, member entity)
    member_bindings: FxHashMap<(ObjectId, EntityId), ObjectId>,
    /// Interned string-literal arrays
    string_literals: FxHashMap<String, ObjectId>,
    /// Poison object produced by invalid dereferences; never alive, so every
    /// read through it cascades into further undefined behavior
    invalid_object: ObjectId,
}

const FIRST_ADDRESS: Address = 0x1000;

impl Memory {
    pub fn new() -> Self {
        let mut memory = Memory {
            next_address: FIRST_ADDRESS,
            ..Memory::default()
        };
        let symbols = SymbolTable::new();
        memory.invalid_object =
            memory.allocate("<invalid>", &Type::int(), StorageKind::Invalid, &symbols);
        memory
    }

    /// The poison object invalid dereferences resolve to
    pub fn invalid_object(&self) -> ObjectId {
        self.invalid_object
    }

    pub fn object(&self, id: ObjectId) -> &Object {
        &self.objects[id]
    }

    pub fn object_mut(&mut self, id: ObjectId) -> &mut Object {
        &mut self.objects[id]
    }

    // ------------------------------------------------------------------
    // Allocation

    /// Allocate storage for an object of `ty`, including its whole subobject
    /// tree. Lifetime is *not* started; initializers do that.
    pub fn allocate(
        &mut self,
        name: &str,
        ty: &Type,
        storage: StorageKind,
        symbols: &SymbolTable,
    ) -> ObjectId {
        let size = ty.size_of(symbols);
        let address = self.next_address;
        self.next_address += size.max(1) as Address;
        let id = self.allocate_at(name, ty, storage, address, None, symbols);
        trace!(object = id, name, size, "allocated");
        id
    }

    fn allocate_at(
        &mut self,
        name: &str,
        ty: &Type,
        storage: StorageKind,
        address: Address,
        containing: Option<ObjectId>,
        symbols: &SymbolTable,
    ) -> ObjectId {
        let id = self.objects.len();
        let size = ty.size_of(symbols);
        self.objects.push(Object {
            id,
            name: name.to_string(),
            ty: ty.clone(),
            storage,
            address,
            size,
            lifetime: Lifetime::NotStarted,
            data: ObjectData::Atomic(AtomicSlot::default()),
            containing,
        });
        let data = match &ty.kind {
            TypeKind::BoundedArray(elem, len) => {
                let elem_size = elem.size_of(symbols) as Address;
                let mut elements = Vec::with_capacity(*len);
                for i in 0..*len {
                    let elem_name = format!("{}[{}]", name, i);
                    elements.push(self.allocate_at(
                        &elem_name,
                        elem,
                        StorageKind::Subobject,
                        address + i as Address * elem_size,
                        Some(id),
                        symbols,
                    ));
                }
                ObjectData::Array { elements }
            }
            TypeKind::Class(class) => self.allocate_class_parts(id, *class, address, symbols),
            _ => ObjectData::Atomic(AtomicSlot::default()),
        };
        self.objects[id].data = data;
        id
    }

    fn allocate_class_parts(
        &mut self,
        id: ObjectId,
        class: ClassId,
        address: Address,
        symbols: &SymbolTable,
    ) -> ObjectData {
        let definition = symbols.class(class);
        let mut offset = 0 as Address;
        let base = definition.base.map(|b| {
            let base_ty = Type::class(b);
            let base_size = base_ty.size_of(symbols) as Address;
            let base_id = self.allocate_at(
                "<base>",
                &base_ty,
                StorageKind::Subobject,
                address,
                Some(id),
                symbols,
            );
            offset += base_size;
            base_id
        });
        let member_entities = definition.members.clone();
        let mut members = Vec::with_capacity(member_entities.len());
        for member in member_entities {
            let entity = symbols.entity(member);
            if entity.is_reference_entity() {
                // Reference members occupy no modeled storage; bindings live
                // in the member-binding table.
                continue;
            }
            let member_name = entity.name.clone();
            let member_ty = entity.ty.clone();
            let member_size = member_ty.size_of(symbols) as Address;
            members.push(self.allocate_at(
                &member_name,
                &member_ty,
                StorageKind::Subobject,
                address + offset,
                Some(id),
                symbols,
            ));
            offset += member_size;
        }
        ObjectData::Class {
            class,
            base,
            members,
        }
    }

    /// The interned char-array object for a string literal: `char[len + 1]`,
    /// null-terminated, alive and fully initialized
    pub fn string_literal(&mut self, literal: &str, symbols: &SymbolTable) -> ObjectId {
        if let Some(&id) = self.string_literals.get(literal) {
            return id;
        }
        let ty = Type::bounded_array(Type::char_(), literal.len() + 1);
        let name = format!("\"{}\"", literal);
        let id = self.allocate(&name, &ty, StorageKind::Static, symbols);
        self.objects[id].lifetime = Lifetime::Alive;
        let elements = self.objects[id].elements().to_vec();
        let bytes = literal.as_bytes();
        for (i, &element) in elements.iter().enumerate() {
            let byte = bytes.get(i).copied().unwrap_or(0) as i8;
            let object = &mut self.objects[element];
            object.lifetime = Lifetime::Alive;
            *object.slot_mut() = AtomicSlot {
                value: Value::Char(byte),
                valid: true,
            };
        }
        self.string_literals.insert(literal.to_string(), id);
        id
    }

    // ------------------------------------------------------------------
    // Lifetime

    /// Start an object's lifetime. One-shot: starting it twice, or starting
    /// a dead object, is an engine bug and panics.
    pub fn begin_lifetime(&mut self, id: ObjectId) {
        let object = &mut self.objects[id];
        assert_eq!(
            object.lifetime,
            Lifetime::NotStarted,
            "lifetime of '{}' started twice",
            object.name
        );
        object.lifetime = Lifetime::Alive;
    }

    /// End an object's lifetime, including its subobjects. Killing a dead or
    /// never-started object is a no-op.
    pub fn kill(&mut self, id: ObjectId) {
        if self.objects[id].lifetime == Lifetime::Dead {
            return;
        }
        self.objects[id].lifetime = Lifetime::Dead;
        let children: Vec<ObjectId> = match &self.objects[id].data {
            ObjectData::Atomic(_) => Vec::new(),
            ObjectData::Array { elements } => elements.clone(),
            ObjectData::Class { base, members, .. } => {
                base.iter().chain(members.iter()).copied().collect()
            }
        };
        for child in children {
            self.kill(child);
        }
    }

    // ------------------------------------------------------------------
    // Reads and writes

    /// Read the atomic value of an object. Never panics on program misuse:
    /// a dead or never-started object reports a lifetime violation and an
    /// invalid value.
    pub fn read_value(&self, id: ObjectId) -> ReadOutcome {
        let object = &self.objects[id];
        let slot = object.slot();
        let lifetime_violation = !object.is_alive();
        ReadOutcome {
            value: slot.value.clone(),
            valid: slot.valid && !lifetime_violation,
            lifetime_violation,
        }
    }

    /// Write the atomic value of an object. The write always lands (the
    /// model has no trap representation); a lifetime violation is reported
    /// for the runtime to surface.
    pub fn write_value(&mut self, id: ObjectId, value: Value) -> WriteOutcome {
        let object = &mut self.objects[id];
        let lifetime_violation = !object.is_alive();
        let valid = value.is_initialized();
        *object.slot_mut() = AtomicSlot { value, valid };
        WriteOutcome { lifetime_violation }
    }

    // ------------------------------------------------------------------
    // Frames

    pub fn push_frame(&mut self, function: EntityId) -> usize {
        self.frames.push(Frame {
            function,
            ..Frame::default()
        });
        self.frames.len() - 1
    }

    /// Pop the top frame, killing whatever frame-owned objects are still
    /// alive (deallocators have already destroyed the observable ones)
    pub fn pop_frame(&mut self) -> Frame {
        let frame = self.frames.pop().expect("frame stack underflow");
        let owned: Vec<ObjectId> = frame
            .locals
            .values()
            .chain(frame.temporaries.values())
            .copied()
            .collect();
        for object in owned {
            self.kill(object);
        }
        frame
    }

    pub fn frame(&self, index: usize) -> &Frame {
        &self.frames[index]
    }

    pub fn frame_mut(&mut self, index: usize) -> &mut Frame {
        &mut self.frames[index]
    }

    // ------------------------------------------------------------------
    // Entity resolution

    /// Resolve an entity to the object it currently designates, relative to
    /// one frame. Returns `None` for bindings that were never established
    /// (e.g. a temporary skipped by short-circuit evaluation).
    pub fn resolve(
        &self,
        frame: usize,
        entity: EntityId,
        symbols: &SymbolTable,
    ) -> Option<ObjectId> {
        let f = &self.frames[frame];
        match &symbols.entity(entity).kind {
            EntityKind::GlobalObject => self.globals.get(&entity).copied(),
            EntityKind::LocalObject | EntityKind::ParameterByValue { .. } => {
                f.locals.get(&entity).copied()
            }
            EntityKind::LocalReference | EntityKind::ParameterByReference { .. } => {
                f.bindings.get(&entity).copied()
            }
            EntityKind::TemporaryObject => f.temporaries.get(&entity).copied(),
            EntityKind::ReturnObject => f.return_object,
            EntityKind::MemberObject { class, index } => {
                let receiver = f.receiver?;
                self.resolve_member(receiver, *class, *index)
            }
            EntityKind::MemberReference { .. } => {
                let receiver = f.receiver?;
                self.member_bindings.get(&(receiver, entity)).copied()
            }
            EntityKind::BaseSubobject { .. } => {
                let receiver = f.receiver?;
                match &self.objects[receiver].data {
                    ObjectData::Class { base, .. } => *base,
                    _ => None,
                }
            }
            EntityKind::Function(_) | EntityKind::Class(_) => None,
        }
    }

    /// The binding of a reference member of `object`, if established
    pub fn member_binding(&self, object: ObjectId, entity: EntityId) -> Option<ObjectId> {
        self.member_bindings.get(&(object, entity)).copied()
    }

    /// Walk from a (possibly derived) object down its base chain to the
    /// member slot declared by `class`
    pub(crate) fn resolve_member(
        &self,
        object: ObjectId,
        class: ClassId,
        index: usize,
    ) -> Option<ObjectId> {
        let mut current = object;
        loop {
            match &self.objects[current].data {
                ObjectData::Class {
                    class: own,
                    base,
                    members,
                } => {
                    if *own == class {
                        return members.get(index).copied();
                    }
                    current = (*base)?;
                }
                _ => return None,
            }
        }
    }

    /// Record a reference binding for `entity` in the context that owns it
    pub fn bind_reference(
        &mut self,
        frame: usize,
        entity: EntityId,
        object: ObjectId,
        symbols: &SymbolTable,
    ) {
        match &symbols.entity(entity).kind {
            EntityKind::GlobalObject => {
                self.globals.insert(entity, object);
            }
            EntityKind::MemberReference { .. } => {
                let receiver = self.frames[frame]
                    .receiver
                    .expect("member reference binding requires a receiver");
                self.member_bindings.insert((receiver, entity), object);
            }
            _ => {
                self.frames[frame].bindings.insert(entity, object);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::object::StorageKind;
    use super::value::Value;
    use super::Memory;
    use crate::entities::SymbolTable;
    use crate::types::Type;

    #[test]
    fn lifetime_is_monotone_and_kill_is_idempotent() {
        let symbols = SymbolTable::new();
        let mut memory = Memory::new();
        let id = memory.allocate("x", &Type::int(), StorageKind::Automatic, &symbols);
        memory.begin_lifetime(id);
        memory.write_value(id, Value::Int(7));
        assert!(memory.object(id).is_alive());

        memory.kill(id);
        memory.kill(id);
        assert!(!memory.object(id).is_alive());

        let read = memory.read_value(id);
        assert!(read.lifetime_violation);
        assert!(!read.valid);
    }

    #[test]
    fn uninitialized_read_is_invalid_but_not_a_lifetime_violation() {
        let symbols = SymbolTable::new();
        let mut memory = Memory::new();
        let id = memory.allocate("x", &Type::int(), StorageKind::Automatic, &symbols);
        memory.begin_lifetime(id);
        let read = memory.read_value(id);
        assert!(!read.valid);
        assert!(!read.lifetime_violation);
    }

    #[test]
    fn string_literals_are_interned_and_null_terminated() {
        let symbols = SymbolTable::new();
        let mut memory = Memory::new();
        let a = memory.string_literal("hi", &symbols);
        let b = memory.string_literal("hi", &symbols);
        assert_eq!(a, b);
        let elements = memory.object(a).elements().to_vec();
        assert_eq!(elements.len(), 3);
        let values: Vec<Value> = elements
            .iter()
            .map(|&e| memory.read_value(e).value)
            .collect();
        assert_eq!(
            values,
            vec![
                Value::Char(b'h' as i8),
                Value::Char(b'i' as i8),
                Value::Char(0)
            ]
        );
    }

    #[test]
    fn poison_object_is_distinguishable_from_static_storage() {
        let memory = Memory::new();
        let poison = memory.invalid_object();
        assert_eq!(memory.object(poison).storage, StorageKind::Invalid);
        assert!(!memory.object(poison).is_alive());
    }

    #[test]
    fn array_elements_get_contiguous_scaled_addresses() {
        let symbols = SymbolTable::new();
        let mut memory = Memory::new();
        let arr = memory.allocate(
            "a",
            &Type::bounded_array(Type::int(), 3),
            StorageKind::Automatic,
            &symbols,
        );
        let base = memory.object(arr).address;
        let elements = memory.object(arr).elements().to_vec();
        for (i, &e) in elements.iter().enumerate() {
            assert_eq!(memory.object(e).address, base + 4 * i as u64);
        }
    }
}

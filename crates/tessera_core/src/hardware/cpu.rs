use crate::config::AllocMethod;
use crate::context::{ExecContext, Externals};
use crate::error::{HardwareError, Result};
use crate::hardware::label::{find_label, Direction, Label};
use crate::hardware::{
    CpuStack, Head, HardwareEvent, HardwareSetup, MemorySpace, Thread, ThreadTable, HEAD_IP,
    NUM_HEADS, NUM_NOPS,
};
use rand::RngCore;
use std::sync::Arc;
use tessera_data::{Genome, GenotypeId, HardwareSnapshot, Instruction};

/// The virtual CPU of one organism.
#[derive(Debug, Clone)]
pub struct Cpu {
    setup: Arc<HardwareSetup>,
    pub(crate) memory: Vec<MemorySpace>,
    pub(crate) global_stacks: Vec<CpuStack>,
    pub(crate) threads: ThreadTable,
    inst_remainder: f64,
    inst_cost: Vec<u32>,
    inst_ft_cost: Vec<u32>,
    pub(crate) inputs: Vec<i32>,
    pub(crate) input_pointer: usize,
    time_used: u64,
    pub(crate) events: Vec<HardwareEvent>,
    /// Set by a successful kill so the step does not advance the thread that
    /// inherited the current slot.
    pub(crate) thread_killed: bool,
}

impl Cpu {
    /// Loads `genome` into main memory; the other spaces start empty.
    #[must_use]
    pub fn new(setup: Arc<HardwareSetup>, genome: &Genome) -> Self {
        let mut memory = vec![MemorySpace::new(); setup.memory_spaces];
        memory[0] = MemorySpace::from_genome(genome);
        let thread = Self::fresh_thread(&setup);
        Self {
            global_stacks: vec![CpuStack::new(setup.stack_depth); setup.global_stacks],
            threads: ThreadTable::new(thread),
            inst_remainder: 0.0,
            inst_cost: vec![0; setup.inst_set.len()],
            inst_ft_cost: (0..setup.inst_set.len())
                .map(|op| setup.inst_set.ft_cost(op as u8))
                .collect(),
            inputs: Vec::new(),
            input_pointer: 0,
            time_used: 0,
            events: Vec::new(),
            thread_killed: false,
            memory,
            setup,
        }
    }

    fn fresh_thread(setup: &HardwareSetup) -> Thread {
        Thread::new(
            0,
            setup.local_stacks,
            setup.stack_depth,
            setup.max_label_size,
        )
    }

    /// Returns the CPU to its just-born state and draws fresh inputs.
    ///
    /// Main memory keeps its instructions; every other space is emptied.
    pub fn reset(&mut self, ext: &mut Externals<'_>) {
        self.memory[0].clear_flags();
        for space in self.memory.iter_mut().skip(1) {
            space.clear();
        }
        for stack in &mut self.global_stacks {
            stack.clear();
        }
        self.threads.reset(Self::fresh_thread(&self.setup));
        self.inst_remainder = 0.0;
        self.inst_cost.fill(0);
        for (op, cost) in self.inst_ft_cost.iter_mut().enumerate() {
            *cost = self.setup.inst_set.ft_cost(op as u8);
        }
        self.inputs = ext.inputs.generate(self.setup.num_inputs, &mut *ext.rng);
        self.input_pointer = 0;
        self.time_used = 0;
        self.events.clear();
        self.thread_killed = false;
    }

    #[must_use]
    pub fn setup(&self) -> &Arc<HardwareSetup> {
        &self.setup
    }

    // ---- Memory ----

    #[must_use]
    pub fn memory(&self, space: usize) -> &MemorySpace {
        &self.memory[self.setup.normalize_space(space)]
    }

    #[must_use]
    pub fn memory_spaces(&self) -> usize {
        self.memory.len()
    }

    /// Main memory as a genome.
    #[must_use]
    pub fn genome(&self) -> Genome {
        self.memory[0].to_genome(self.memory[0].len())
    }

    pub(crate) fn first_empty_space(&self) -> Option<usize> {
        (1..self.memory.len()).find(|&s| self.memory[s].is_empty())
    }

    /// Resizes a space using the configured allocation strategy.
    pub(crate) fn allocate(&mut self, space: usize, new_len: usize, rng: &mut dyn RngCore) {
        let setup = Arc::clone(&self.setup);
        let fill = setup.default_inst;
        let mem = &mut self.memory[space];
        match setup.alloc_method {
            AllocMethod::Default => mem.resize(new_len, fill),
            AllocMethod::Necro => mem.resize_necro(new_len, fill),
            AllocMethod::Random => mem.resize_with(new_len, || setup.inst_set.random_inst(rng)),
        }
    }

    /// Grows a space by one slot when a write lands on its last position.
    pub(crate) fn grow_for_write(&mut self, space: usize, position: usize, rng: &mut dyn RngCore) {
        let len = self.memory[space].len();
        if position + 1 == len && len < self.setup.divide.max_genome_len {
            self.allocate(space, len + 1, rng);
        }
    }

    // ---- Stacks ----

    /// Stack by id; ids alias modulo the stack count.
    #[must_use]
    pub fn stack(&self, id: usize) -> &CpuStack {
        let id = id % self.setup.num_stacks();
        if id < self.setup.local_stacks {
            &self.threads.current().stacks[id]
        } else {
            &self.global_stacks[id - self.setup.local_stacks]
        }
    }

    pub fn stack_mut(&mut self, id: usize) -> &mut CpuStack {
        let id = id % self.setup.num_stacks();
        if id < self.setup.local_stacks {
            &mut self.threads.current_mut().stacks[id]
        } else {
            &mut self.global_stacks[id - self.setup.local_stacks]
        }
    }

    pub fn push_stack(&mut self, id: usize, value: i32) {
        self.stack_mut(id).push(value);
    }

    pub fn pop_stack(&mut self, id: usize) -> Option<i32> {
        self.stack_mut(id).pop()
    }

    // ---- Heads ----

    #[must_use]
    pub fn head(&self, head: usize) -> Head {
        self.threads.current().heads[head % NUM_HEADS]
    }

    pub fn head_mut(&mut self, head: usize) -> &mut Head {
        &mut self.threads.current_mut().heads[head % NUM_HEADS]
    }

    pub fn set_head(&mut self, head: usize, space: usize, position: usize) {
        let space = self.setup.normalize_space(space);
        self.head_mut(head).set(space, position);
    }

    /// Normalized (space, position) of a head of the current thread.
    pub fn head_location(&self, head: usize) -> Result<(usize, usize)> {
        let h = self.head(head);
        let space = self.setup.normalize_space(h.space());
        Ok((space, h.position(self.memory[space].len())?))
    }

    /// Steps a head forward by one within its space.
    pub(crate) fn step_head(&mut self, head: usize) {
        let space = self.setup.normalize_space(self.head(head).space());
        let len = self.memory[space].len();
        self.head_mut(head).step(len);
    }

    // ---- Labels and modifiers ----

    /// Consumes the instruction after the IP if it is a nop and returns its
    /// symbol. Never wraps past the end of the space.
    pub(crate) fn read_modifier(&mut self) -> Option<u8> {
        let (space, pos) = self.head_location(HEAD_IP).ok()?;
        let next = pos + 1;
        let inst = *self.memory[space].instructions().get(next)?;
        let nop = self.setup.inst_set.nop_mod(inst)?;
        self.head_mut(HEAD_IP).set_position(next);
        self.memory[space].mark_executed(next).ok()?;
        Some(nop)
    }

    pub(crate) fn find_modified_stack(&mut self, default: usize) -> usize {
        self.read_modifier()
            .map_or(default, |n| usize::from(n) % self.setup.num_stacks())
    }

    pub(crate) fn find_modified_head(&mut self, default: usize) -> usize {
        self.read_modifier()
            .map_or(default, |n| usize::from(n) % NUM_HEADS)
    }

    /// Reads the nops following the IP into the thread's label register.
    pub(crate) fn read_label(&mut self) {
        let max = self.setup.max_label_size;
        self.threads.current_mut().next_label.clear();
        while self.threads.current().next_label.len() < max {
            match self.read_modifier() {
                Some(nop) => {
                    self.threads.current_mut().next_label.push(nop);
                }
                None => break,
            }
        }
    }

    /// Tracks nops passing through READ so `if-label` can spot end markers.
    pub(crate) fn read_inst(&mut self, inst: Instruction) {
        let nop = self.setup.inst_set.nop_mod(inst);
        let label = &mut self.threads.current_mut().read_label;
        match nop {
            Some(n) => {
                label.push(n);
            }
            None => label.clear(),
        }
    }

    /// Searches a space for the complement of `label`.
    #[must_use]
    pub fn find_label(
        &self,
        space: usize,
        from: usize,
        direction: Direction,
        label: &Label,
    ) -> Option<usize> {
        find_label(
            self.memory(space),
            &self.setup.inst_set,
            from,
            direction,
            label,
            NUM_NOPS,
        )
    }

    // ---- Threads ----

    #[must_use]
    pub fn threads(&self) -> &ThreadTable {
        &self.threads
    }

    #[must_use]
    pub fn thread_count(&self) -> usize {
        self.threads.len()
    }

    #[must_use]
    pub fn cur_thread(&self) -> usize {
        self.threads.current_index()
    }

    pub fn set_cur_thread(&mut self, index: usize) {
        self.threads.set_current(index);
    }

    /// Clones the current thread; returns the new thread's index.
    pub fn fork_thread(&mut self) -> Result<usize> {
        self.threads.fork(self.setup.max_threads)
    }

    pub fn kill_thread(&mut self) -> Result<()> {
        self.threads.kill_current()
    }

    pub fn kill_thread_at(&mut self, index: usize) -> Result<()> {
        self.threads.kill_at(index)
    }

    /// Places foreign code in the first empty space and starts a thread
    /// there on behalf of `owner`.
    pub fn inject_host(&mut self, code: &Genome, owner: GenotypeId) -> Result<usize> {
        let space = self.first_empty_space().ok_or(HardwareError::NoEmptySpace)?;
        let mut thread = Self::fresh_thread(&self.setup);
        thread.heads = [Head::new(space, 0); NUM_HEADS];
        thread.owner = Some(owner);
        let index = self.threads.push(thread, self.setup.max_threads)?;
        let mem = &mut self.memory[space];
        *mem = MemorySpace::from_genome(code);
        mem.mark_injected();
        Ok(index)
    }

    /// Whether any thread belongs to a parasite.
    #[must_use]
    pub fn test_parasite(&self) -> bool {
        self.threads.iter().any(|t| t.owner.is_some())
    }

    // ---- Execution ----

    /// One update's worth of execution across all threads.
    ///
    /// Each thread receives the slice for the current thread count plus the
    /// carried fractional remainder and runs the whole part of that credit.
    /// Returns the number of instruction steps taken.
    pub fn single_process(&mut self, ctx: &mut ExecContext<'_, '_>) -> u64 {
        self.time_used += 1;
        let mut executed = 0;
        let mut t = 0;
        while t < self.threads.len() {
            self.threads.set_current(t);
            let credit = self.setup.slice_for(self.threads.len()) + self.inst_remainder;
            let whole = credit.floor();
            self.inst_remainder = credit - whole;
            let mut killed = false;
            for _ in 0..whole as u64 {
                self.step(ctx);
                executed += 1;
                if self.thread_killed {
                    killed = true;
                    break;
                }
            }
            // a killed thread's slot now holds its successor
            if !killed {
                t += 1;
            }
        }
        let last = self.threads.len() - 1;
        if self.threads.current_index() > last {
            self.threads.set_current(last);
        }
        executed
    }

    /// Executes one instruction on the current thread.
    ///
    /// Returns whether the instruction had an effect; an instruction still
    /// waiting on its cost returns `false` and leaves the IP in place.
    pub fn step(&mut self, ctx: &mut ExecContext<'_, '_>) -> bool {
        self.thread_killed = false;
        let (space, pos) = match self.head_location(HEAD_IP) {
            Ok(loc) => loc,
            Err(_) => {
                self.set_head(HEAD_IP, 0, 0);
                match self.head_location(HEAD_IP) {
                    Ok(loc) => loc,
                    Err(_) => return false,
                }
            }
        };
        let inst = self.memory[space].instructions()[pos];
        let _ = self.memory[space].mark_executed(pos);

        if self.setup.costs_enabled && !self.pay_costs(inst) {
            return false;
        }

        self.head_mut(HEAD_IP).set_advance(true);
        let success = match self.setup.inst_set.opcode(inst) {
            Some(op) => self.execute(op, ctx),
            None => false,
        };
        if !self.thread_killed && self.head(HEAD_IP).advance_flag() {
            self.step_head(HEAD_IP);
        }
        success
    }

    /// First-time costs are paid off one attempt at a time; a per-use cost
    /// of `n > 1` lets the instruction through on every `n`th attempt.
    fn pay_costs(&mut self, inst: Instruction) -> bool {
        let op = usize::from(inst.op);
        if let Some(ft) = self.inst_ft_cost.get_mut(op) {
            if *ft > 0 {
                *ft -= 1;
                return false;
            }
        }
        let cost = self.setup.inst_set.cost(inst.op);
        if cost > 1 {
            if let Some(wait) = self.inst_cost.get_mut(op) {
                if *wait == 0 {
                    *wait = cost;
                }
                *wait -= 1;
                if *wait > 0 {
                    return false;
                }
            }
        }
        true
    }

    /// Next value from the input buffer, cycling.
    pub(crate) fn next_input(&mut self) -> Option<i32> {
        if self.inputs.is_empty() {
            return None;
        }
        let value = self.inputs[self.input_pointer % self.inputs.len()];
        self.input_pointer = (self.input_pointer + 1) % self.inputs.len();
        Some(value)
    }

    #[must_use]
    pub fn inputs(&self) -> &[i32] {
        &self.inputs
    }

    #[must_use]
    pub fn time_used(&self) -> u64 {
        self.time_used
    }

    #[must_use]
    pub fn inst_remainder(&self) -> f64 {
        self.inst_remainder
    }

    /// Drains events produced since the last call.
    pub fn take_events(&mut self) -> Vec<HardwareEvent> {
        std::mem::take(&mut self.events)
    }

    // ---- Snapshots ----

    #[must_use]
    pub fn snapshot(&self) -> HardwareSnapshot {
        HardwareSnapshot {
            memory: self.memory.iter().map(MemorySpace::snapshot).collect(),
            global_stacks: self.global_stacks.iter().map(CpuStack::to_vec).collect(),
            threads: self.threads.iter().map(Thread::snapshot).collect(),
            cur_thread: self.threads.current_index(),
            inst_remainder: self.inst_remainder,
            inst_cost: self.inst_cost.clone(),
            inst_ft_cost: self.inst_ft_cost.clone(),
            inputs: self.inputs.clone(),
            input_pointer: self.input_pointer,
            time_used: self.time_used,
        }
    }

    pub fn from_snapshot(setup: Arc<HardwareSetup>, snapshot: &HardwareSnapshot) -> Result<Self> {
        if snapshot.memory.len() != setup.memory_spaces
            || snapshot.global_stacks.len() != setup.global_stacks
        {
            return Err(HardwareError::InvalidSnapshot(format!(
                "expected {} memory spaces and {} global stacks",
                setup.memory_spaces, setup.global_stacks
            )));
        }
        if snapshot.inst_cost.len() != setup.inst_set.len()
            || snapshot.inst_ft_cost.len() != setup.inst_set.len()
        {
            return Err(HardwareError::InvalidSnapshot(
                "cost tables do not match the instruction set".to_string(),
            ));
        }
        let memory = snapshot
            .memory
            .iter()
            .map(MemorySpace::from_snapshot)
            .collect::<Result<Vec<_>>>()?;
        let threads = snapshot
            .threads
            .iter()
            .map(|t| {
                Thread::from_snapshot(
                    t,
                    setup.local_stacks,
                    setup.stack_depth,
                    setup.max_label_size,
                )
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            memory,
            global_stacks: snapshot
                .global_stacks
                .iter()
                .map(|values| CpuStack::from_values(values, setup.stack_depth))
                .collect(),
            threads: ThreadTable::from_parts(threads, snapshot.cur_thread)?,
            inst_remainder: snapshot.inst_remainder,
            inst_cost: snapshot.inst_cost.clone(),
            inst_ft_cost: snapshot.inst_ft_cost.clone(),
            inputs: snapshot.inputs.clone(),
            input_pointer: snapshot.input_pointer,
            time_used: snapshot.time_used,
            events: Vec::new(),
            thread_killed: false,
            setup,
        })
    }
}

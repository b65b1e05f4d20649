//! Instruction handlers.
//!
//! Every handler returns `true` when the instruction took effect and `false`
//! when it was a no-op (empty stack, failed search, refused fork, ...).
//! A `false` is never escalated; execution continues with the next
//! instruction.

use crate::context::ExecContext;
use crate::error::{HardwareError, Result};
use crate::hardware::cpu::Cpu;
use crate::hardware::label::Direction;
use crate::hardware::{
    HardwareEvent, Opcode, HEAD_FLOW, HEAD_IP, HEAD_READ, HEAD_WRITE, NUM_NOPS, STACK_AX,
    STACK_BX, STACK_CX,
};
use crate::mutation::chance;
use rand::RngCore;
use tessera_data::Instruction;

impl Cpu {
    pub(crate) fn execute(&mut self, op: Opcode, ctx: &mut ExecContext<'_, '_>) -> bool {
        match op {
            Opcode::Nop(_) => true,

            Opcode::ShiftRight => self.unary_op(|v| v >> 1),
            Opcode::ShiftLeft => self.unary_op(|v| v.wrapping_shl(1)),
            Opcode::Inc => self.unary_op(|v| v.wrapping_add(1)),
            Opcode::Dec => self.unary_op(|v| v.wrapping_sub(1)),
            Opcode::Nand => self.binary_op(|b, c| Some(!(b & c))),
            Opcode::Add => self.binary_op(|b, c| Some(b.wrapping_add(c))),
            Opcode::Sub => self.binary_op(|b, c| Some(b.wrapping_sub(c))),
            Opcode::Mult => self.binary_op(|b, c| Some(b.wrapping_mul(c))),
            Opcode::Div => self.binary_op(i32::checked_div),
            Opcode::Mod => self.binary_op(i32::checked_rem),

            Opcode::SetMemory => self.inst_set_memory(ctx),
            Opcode::Divide => self.inst_divide(ctx),
            Opcode::Inject => self.inst_inject(),
            Opcode::InstRead => self.inst_read(ctx),
            Opcode::InstWrite => self.inst_write(ctx),
            Opcode::Copy => self.inst_copy(ctx),
            Opcode::CopyErrorCorrect => self.inst_copy_error_correct(ctx),

            Opcode::IfEqual => self.conditional(|a, b| a == b),
            Opcode::IfNotEqual => self.conditional(|a, b| a != b),
            Opcode::IfLess => self.conditional(|a, b| a < b),
            Opcode::IfGreater => self.conditional(|a, b| a > b),

            Opcode::HeadPush => self.inst_head_push(),
            Opcode::HeadPop => self.inst_head_pop(),
            Opcode::HeadMove => self.inst_head_move(),
            Opcode::Search => self.inst_search(),

            Opcode::PushNext => self.move_between_stacks(|setup, s| setup.next_stack(s)),
            Opcode::PushPrev => self.move_between_stacks(|setup, s| setup.prev_stack(s)),
            Opcode::PushComp => self.move_between_stacks(|setup, s| setup.complement_stack(s)),
            Opcode::Delete => {
                let s = self.find_modified_stack(STACK_BX);
                self.pop_stack(s).is_some()
            }
            Opcode::CopyValue => {
                let s = self.find_modified_stack(STACK_BX);
                match self.stack(s).top() {
                    Some(v) => {
                        self.push_stack(s, v);
                        true
                    }
                    None => false,
                }
            }

            Opcode::ForkThread => {
                // the child starts on the instruction after the fork; the
                // parent skips it
                self.step_head(HEAD_IP);
                match self.fork_thread() {
                    Ok(_) => true,
                    Err(e) => {
                        tracing::trace!(error = %e, "fork-thread refused");
                        false
                    }
                }
            }
            Opcode::KillThread => match self.kill_thread() {
                Ok(()) => {
                    self.thread_killed = true;
                    true
                }
                Err(_) => false,
            },
            Opcode::IfLabel => self.inst_if_label(),
            Opcode::Io => self.inst_io(ctx),

            Opcode::RotateLeft => ctx.interface.rotate(-1),
            Opcode::RotateRight => ctx.interface.rotate(1),
            Opcode::GetFacing => {
                let s = self.find_modified_stack(STACK_BX);
                self.push_stack(s, ctx.interface.facing());
                true
            }
            Opcode::SenseNeighbors => {
                let s = self.find_modified_stack(STACK_BX);
                let count = ctx.interface.occupied_neighbors();
                self.push_stack(s, i32::try_from(count).unwrap_or(i32::MAX));
                true
            }
            Opcode::GetCellData => {
                let s = self.find_modified_stack(STACK_BX);
                self.push_stack(s, ctx.interface.cell_data().contents);
                true
            }
            Opcode::SetCellData => {
                let s = self.find_modified_stack(STACK_BX);
                match self.stack(s).top() {
                    Some(v) => {
                        ctx.interface.set_cell_data(v, ctx.ext.update);
                        true
                    }
                    None => false,
                }
            }
        }
    }

    fn unary_op(&mut self, f: impl Fn(i32) -> i32) -> bool {
        let s = self.find_modified_stack(STACK_BX);
        match self.pop_stack(s) {
            Some(v) => {
                self.push_stack(s, f(v));
                true
            }
            None => false,
        }
    }

    fn binary_op(&mut self, f: impl Fn(i32, i32) -> Option<i32>) -> bool {
        let dst = self.find_modified_stack(STACK_BX);
        let (Some(b), Some(c)) = (self.stack(STACK_BX).top(), self.stack(STACK_CX).top()) else {
            return false;
        };
        match f(b, c) {
            Some(v) => {
                self.push_stack(dst, v);
                true
            }
            None => false,
        }
    }

    fn conditional(&mut self, cond: impl Fn(i32, i32) -> bool) -> bool {
        let a = self.find_modified_stack(STACK_AX);
        let b = self.setup().next_stack(a);
        let (Some(x), Some(y)) = (self.stack(a).top(), self.stack(b).top()) else {
            return false;
        };
        if !cond(x, y) {
            self.step_head(HEAD_IP);
        }
        true
    }

    fn move_between_stacks(
        &mut self,
        target: impl Fn(&crate::hardware::HardwareSetup, usize) -> usize,
    ) -> bool {
        let src = self.find_modified_stack(STACK_AX);
        let dst = target(self.setup(), src);
        match self.pop_stack(src) {
            Some(v) => {
                self.push_stack(dst, v);
                true
            }
            None => false,
        }
    }

    fn inst_set_memory(&mut self, ctx: &mut ExecContext<'_, '_>) -> bool {
        let space = match self.read_modifier() {
            Some(n) => self.setup().normalize_space(usize::from(n)),
            None => match self.first_empty_space() {
                Some(s) => s,
                None => return false,
            },
        };
        if self.memory[space].is_empty() {
            self.allocate(space, 1, &mut *ctx.ext.rng);
        }
        self.set_head(HEAD_FLOW, space, 0);
        true
    }

    fn inst_divide(&mut self, ctx: &mut ExecContext<'_, '_>) -> bool {
        let space = self.head(HEAD_WRITE).space();
        let rates = ctx.interface.mut_rates();
        match self.divide_main(space, 1.0, rates, &mut *ctx.ext.rng) {
            Ok(_) => true,
            Err(HardwareError::InvalidDivide(failure)) => {
                tracing::debug!(reason = %failure, "divide rejected");
                self.events.push(HardwareEvent::DivideFailed(failure));
                false
            }
            Err(e) => {
                tracing::debug!(error = %e, "divide failed");
                false
            }
        }
    }

    /// Sends the code in a non-main space to the faced neighbor.
    fn inst_inject(&mut self) -> bool {
        let space = match self.read_modifier() {
            Some(n) => self.setup().normalize_space(usize::from(n)),
            None => self.setup().normalize_space(self.head(HEAD_WRITE).space()),
        };
        if space == 0 || self.memory[space].is_empty() {
            return false;
        }
        let size = self.child_size(space);
        let code = self.memory[space].to_genome(size);
        self.memory[space].clear();
        let thread = self.threads.current_mut();
        thread.reset_copy_heads();
        thread.read_label.clear();
        self.events.push(HardwareEvent::Injection { code });
        true
    }

    fn copy_mutation_rate(ctx: &ExecContext<'_, '_>) -> f64 {
        ctx.interface.mut_rates().copy_mut_prob
    }

    fn inst_read(&mut self, ctx: &mut ExecContext<'_, '_>) -> bool {
        let head = self.find_modified_head(HEAD_READ);
        let Ok((space, pos)) = self.head_location(head) else {
            return false;
        };
        let mut inst = self.memory[space].instructions()[pos];
        let rate = Self::copy_mutation_rate(ctx);
        if chance(&mut *ctx.ext.rng, rate) {
            inst = self.setup().inst_set.random_inst(&mut *ctx.ext.rng);
        }
        self.push_stack(STACK_AX, i32::from(inst.op));
        self.read_inst(inst);
        self.step_head(head);
        true
    }

    fn inst_write(&mut self, ctx: &mut ExecContext<'_, '_>) -> bool {
        let head = self.find_modified_head(HEAD_WRITE);
        let Ok((space, pos)) = self.head_location(head) else {
            return false;
        };
        let Some(value) = self.pop_stack(STACK_AX) else {
            return false;
        };
        let op = if (0..self.setup().inst_set.len() as i32).contains(&value) {
            value as u8
        } else {
            0
        };
        self.grow_for_write(space, pos, &mut *ctx.ext.rng);
        if self.memory[space]
            .copy_in(pos, Instruction::new(op), false)
            .is_err()
        {
            return false;
        }
        self.step_head(head);
        true
    }

    /// Copies READ to WRITE, optionally replacing the instruction with a
    /// random one, then steps both heads.
    fn copy_step(&mut self, mutate: bool, rng: &mut dyn RngCore) -> bool {
        let (Ok((rs, rp)), Ok((ws, wp))) =
            (self.head_location(HEAD_READ), self.head_location(HEAD_WRITE))
        else {
            return false;
        };
        let mut inst = self.memory[rs].instructions()[rp];
        if mutate {
            inst = self.setup().inst_set.random_inst(rng);
        }
        self.read_inst(inst);
        self.grow_for_write(ws, wp, rng);
        if self.memory[ws].copy_in(wp, inst, mutate).is_err() {
            return false;
        }
        self.step_head(HEAD_READ);
        self.step_head(HEAD_WRITE);
        true
    }

    fn inst_copy(&mut self, ctx: &mut ExecContext<'_, '_>) -> bool {
        let rate = Self::copy_mutation_rate(ctx);
        let mutate = chance(&mut *ctx.ext.rng, rate);
        self.copy_step(mutate, &mut *ctx.ext.rng)
    }

    /// Copy with the error rate divided by `reduction`. A detected error
    /// triggers another attempt; once the retry budget is spent nothing is
    /// written, the heads stay put and `CopyCorrectionExhausted` is returned.
    pub fn head_copy_error_correct(
        &mut self,
        reduction: f64,
        copy_mut_prob: f64,
        rng: &mut dyn RngCore,
    ) -> Result<bool> {
        self.head_location(HEAD_READ)?;
        self.head_location(HEAD_WRITE)?;
        let attempts = self.setup().divide.error_correct_retries + 1;
        let rate = copy_mut_prob / reduction;
        for _ in 0..attempts {
            if !chance(rng, rate) {
                return Ok(self.copy_step(false, rng));
            }
        }
        Err(HardwareError::CopyCorrectionExhausted { attempts })
    }

    fn inst_copy_error_correct(&mut self, ctx: &mut ExecContext<'_, '_>) -> bool {
        let reduction = self.setup().divide.error_correct_reduction;
        let rate = Self::copy_mutation_rate(ctx);
        match self.head_copy_error_correct(reduction, rate, &mut *ctx.ext.rng) {
            Ok(copied) => copied,
            Err(HardwareError::CopyCorrectionExhausted { attempts }) => {
                tracing::debug!(attempts, "copy error correction exhausted");
                self.events
                    .push(HardwareEvent::CopyCorrectionExhausted { attempts });
                false
            }
            Err(_) => false,
        }
    }

    fn inst_head_push(&mut self) -> bool {
        let head = self.find_modified_head(HEAD_IP);
        match self.head_location(head) {
            Ok((_, pos)) => {
                self.push_stack(STACK_BX, pos as i32);
                true
            }
            Err(_) => false,
        }
    }

    fn inst_head_pop(&mut self) -> bool {
        let head = self.find_modified_head(HEAD_IP);
        let space = self.setup().normalize_space(self.head(head).space());
        let len = self.memory[space].len();
        if len == 0 {
            return false;
        }
        let Some(value) = self.pop_stack(STACK_BX) else {
            return false;
        };
        self.head_mut(head)
            .set_position(i64::from(value).rem_euclid(len as i64) as usize);
        true
    }

    fn inst_head_move(&mut self) -> bool {
        let head = self.find_modified_head(HEAD_IP);
        if head == HEAD_FLOW {
            self.step_head(HEAD_FLOW);
            return true;
        }
        let flow = self.head(HEAD_FLOW);
        self.head_mut(head).move_to(&flow);
        if head == HEAD_IP {
            self.head_mut(HEAD_IP).set_advance(false);
        }
        true
    }

    /// Moves FLOW just past the complement of the label that follows.
    ///
    /// Pushes the distance to BX and the label size to CX. Without a label
    /// FLOW lands on the next instruction and both pushes are zero.
    fn inst_search(&mut self) -> bool {
        self.read_label();
        let Ok((space, pos)) = self.head_location(HEAD_IP) else {
            return false;
        };
        let label = self.threads.current().next_label.clone();
        if label.is_empty() {
            self.set_head(HEAD_FLOW, space, pos + 1);
            self.push_stack(STACK_BX, 0);
            self.push_stack(STACK_CX, 0);
            return true;
        }
        match self.find_label(space, pos + 1, Direction::Forward, &label) {
            Some(found) => {
                self.set_head(HEAD_FLOW, space, found);
                self.push_stack(STACK_BX, (found as i64 - pos as i64) as i32);
                self.push_stack(STACK_CX, label.len() as i32);
                true
            }
            None => false,
        }
    }

    /// Skips the next instruction unless the nops read through READ match
    /// the complement of the label that follows.
    fn inst_if_label(&mut self) -> bool {
        self.read_label();
        let thread = self.threads.current();
        let matched = thread.next_label.complement(NUM_NOPS).as_slice()
            == thread.read_label.as_slice();
        if !matched {
            self.step_head(HEAD_IP);
        }
        true
    }

    fn inst_io(&mut self, ctx: &mut ExecContext<'_, '_>) -> bool {
        let s = self.find_modified_stack(STACK_BX);
        if let Some(out) = self.pop_stack(s) {
            ctx.ext.feedback.on_output(out, &self.inputs);
        }
        match self.next_input() {
            Some(input) => {
                self.push_stack(s, input);
                true
            }
            None => false,
        }
    }
}

/*++

Licensed under the Apache-2.0 license.

File Name:

    mem.rs

Abstract:

    File contains the one-read one-write memory banks of the multiplier and
    their read-latency pipes.

--*/

use crate::mm::config::PAGE_WORDS;
use std::collections::VecDeque;

/// Destination of an in-flight read.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReadTag {
    /// Resident operand limb headed for a unit's B register.
    Resident { unit: usize },
    /// Streamed operand limb headed for the A bus.
    Stream { limb: usize },
    /// Partial coefficient term headed for the accumulator.
    Term { weight: usize },
}

/// Synchronous RAM bank with one read port, one write port and a fixed
/// read latency.
///
/// A read issued on cycle `c` captures the stored word immediately and
/// surfaces it from `tick` on cycle `c + latency`. At most one read issue and
/// one write are legal per cycle; the model treats a second access as a fatal
/// port collision.
pub struct SyncRam {
    name: &'static str,
    words: Vec<u32>,
    pipe: VecDeque<Option<(ReadTag, u32)>>,
    read_issued: bool,
    write_done: bool,
}

impl SyncRam {
    pub fn new(name: &'static str, words: usize, latency: u32) -> Self {
        debug_assert!(latency >= 1);
        Self {
            name,
            words: vec![0; words],
            pipe: std::iter::repeat(None).take(latency as usize).collect(),
            read_issued: false,
            write_done: false,
        }
    }

    /// Starts a new cycle: clears the port occupancy and returns the read
    /// that was issued `latency` cycles ago, if any.
    pub fn tick(&mut self) -> Option<(ReadTag, u32)> {
        self.read_issued = false;
        self.write_done = false;
        let out = self.pipe.pop_front().flatten();
        self.pipe.push_back(None);
        out
    }

    pub fn issue_read(&mut self, addr: usize, tag: ReadTag) {
        debug_assert!(
            !self.read_issued,
            "{}: second read issued in one cycle",
            self.name
        );
        self.read_issued = true;
        let val = self.words[addr];
        if let Some(slot) = self.pipe.back_mut() {
            *slot = Some((tag, val));
        }
    }

    pub fn write(&mut self, addr: usize, val: u32) {
        debug_assert!(
            !self.write_done,
            "{}: second write in one cycle",
            self.name
        );
        self.write_done = true;
        self.words[addr] = val;
    }

    /// Direct word access for the host interface. Host traffic is arbitrated
    /// outside the datapath and does not occupy the compute ports.
    pub fn word(&self, addr: usize) -> u32 {
        self.words[addr]
    }

    pub fn set_word(&mut self, addr: usize, val: u32) {
        self.words[addr] = val;
    }

    /// Drops in-flight reads. Stored words survive; only the pipe state is
    /// part of the resettable datapath.
    pub fn reset_pipe(&mut self) {
        for slot in self.pipe.iter_mut() {
            *slot = None;
        }
        self.read_issued = false;
        self.write_done = false;
    }
}

/// Operand pages, in bank order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OperandPage {
    X,
    Y,
    P,
    Pprime,
    Z,
}

impl OperandPage {
    fn index(self) -> usize {
        match self {
            OperandPage::X => 0,
            OperandPage::Y => 1,
            OperandPage::P => 2,
            OperandPage::Pprime => 3,
            OperandPage::Z => 4,
        }
    }
}

/// Pages of the two-page working RAM.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TramPage {
    /// Low product limbs kept for the recoding phase.
    S,
    /// Recoding operand built during the recoding phase.
    Alpha,
}

impl TramPage {
    fn index(self) -> usize {
        match self {
            TramPage::S => 0,
            TramPage::Alpha => 1,
        }
    }
}

enum OperandStore {
    /// One bank holds all five pages.
    Unified(SyncRam),
    /// Operands and result live in separate banks.
    Split { iram: SyncRam, zram: SyncRam },
}

/// Operand and working memories of one multiplier instance.
pub struct Memories {
    store: OperandStore,
    tram: SyncRam,
}

impl Memories {
    pub fn new(split: bool, latency: u32) -> Self {
        let store = if split {
            OperandStore::Split {
                iram: SyncRam::new("iram", 4 * PAGE_WORDS, latency),
                zram: SyncRam::new("zram", PAGE_WORDS, latency),
            }
        } else {
            OperandStore::Unified(SyncRam::new("oram", 5 * PAGE_WORDS, latency))
        };
        Self {
            store,
            tram: SyncRam::new("tram", 2 * PAGE_WORDS, latency),
        }
    }

    pub fn store_tick(&mut self) -> Option<(ReadTag, u32)> {
        match &mut self.store {
            OperandStore::Unified(oram) => oram.tick(),
            OperandStore::Split { iram, zram } => {
                zram.tick();
                iram.tick()
            }
        }
    }

    pub fn tram_tick(&mut self) -> Option<(ReadTag, u32)> {
        self.tram.tick()
    }

    pub fn issue_operand_read(&mut self, page: OperandPage, limb: usize, tag: ReadTag) {
        debug_assert!(limb < PAGE_WORDS);
        match &mut self.store {
            OperandStore::Unified(oram) => {
                oram.issue_read(page.index() * PAGE_WORDS + limb, tag);
            }
            OperandStore::Split { iram, .. } => {
                debug_assert!(page != OperandPage::Z, "result bank has no compute read port");
                iram.issue_read(page.index() * PAGE_WORDS + limb, tag);
            }
        }
    }

    pub fn issue_tram_read(&mut self, page: TramPage, limb: usize, tag: ReadTag) {
        debug_assert!(limb < PAGE_WORDS);
        self.tram.issue_read(page.index() * PAGE_WORDS + limb, tag);
    }

    pub fn write_tram(&mut self, page: TramPage, limb: usize, val: u32) {
        debug_assert!(limb < PAGE_WORDS);
        self.tram.write(page.index() * PAGE_WORDS + limb, val);
    }

    pub fn write_z(&mut self, limb: usize, val: u32) {
        debug_assert!(limb < PAGE_WORDS);
        match &mut self.store {
            OperandStore::Unified(oram) => {
                oram.write(OperandPage::Z.index() * PAGE_WORDS + limb, val);
            }
            OperandStore::Split { zram, .. } => zram.write(limb, val),
        }
    }

    pub fn host_read(&self, page: OperandPage, limb: usize) -> u32 {
        match &self.store {
            OperandStore::Unified(oram) => oram.word(page.index() * PAGE_WORDS + limb),
            OperandStore::Split { iram, zram } => match page {
                OperandPage::Z => zram.word(limb),
                _ => iram.word(page.index() * PAGE_WORDS + limb),
            },
        }
    }

    pub fn host_write(&mut self, page: OperandPage, limb: usize, val: u32) {
        match &mut self.store {
            OperandStore::Unified(oram) => {
                oram.set_word(page.index() * PAGE_WORDS + limb, val);
            }
            OperandStore::Split { iram, zram } => match page {
                OperandPage::Z => zram.set_word(limb, val),
                _ => iram.set_word(page.index() * PAGE_WORDS + limb, val),
            },
        }
    }

    pub fn reset_pipes(&mut self) {
        match &mut self.store {
            OperandStore::Unified(oram) => oram.reset_pipe(),
            OperandStore::Split { iram, zram } => {
                iram.reset_pipe();
                zram.reset_pipe();
            }
        }
        self.tram.reset_pipe();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_latency() {
        let mut ram = SyncRam::new("test", 8, 3);
        ram.write(5, 0xabcd);
        assert_eq!(ram.tick(), None);

        ram.issue_read(5, ReadTag::Stream { limb: 5 });
        // The word comes back on the third tick after the issue.
        assert_eq!(ram.tick(), None);
        assert_eq!(ram.tick(), None);
        assert_eq!(ram.tick(), Some((ReadTag::Stream { limb: 5 }, 0xabcd)));
        assert_eq!(ram.tick(), None);
    }

    #[test]
    fn test_read_captures_at_issue() {
        let mut ram = SyncRam::new("test", 4, 2);
        ram.write(1, 7);
        ram.tick();
        ram.issue_read(1, ReadTag::Term { weight: 1 });
        ram.tick();
        // Overwriting after the issue must not disturb the in-flight word.
        ram.write(1, 9);
        assert_eq!(ram.tick(), Some((ReadTag::Term { weight: 1 }, 7)));
        assert_eq!(ram.word(1), 9);
    }

    #[test]
    fn test_back_to_back_reads() {
        let mut ram = SyncRam::new("test", 4, 2);
        for addr in 0..4 {
            ram.set_word(addr, addr as u32 + 10);
        }
        let mut got = Vec::new();
        for cycle in 0..6 {
            if let Some((_, val)) = ram.tick() {
                got.push(val);
            }
            if cycle < 4 {
                ram.issue_read(cycle, ReadTag::Stream { limb: cycle });
            }
        }
        assert_eq!(got, vec![10, 11, 12, 13]);
    }

    #[test]
    #[should_panic(expected = "second read issued in one cycle")]
    fn test_read_port_collision() {
        let mut ram = SyncRam::new("test", 4, 1);
        ram.tick();
        ram.issue_read(0, ReadTag::Stream { limb: 0 });
        ram.issue_read(1, ReadTag::Stream { limb: 1 });
    }

    #[test]
    #[should_panic(expected = "second write in one cycle")]
    fn test_write_port_collision() {
        let mut ram = SyncRam::new("test", 4, 1);
        ram.tick();
        ram.write(0, 1);
        ram.write(1, 2);
    }

    #[test]
    fn test_reset_pipe_keeps_words() {
        let mut ram = SyncRam::new("test", 4, 2);
        ram.write(2, 0x55);
        ram.tick();
        ram.issue_read(2, ReadTag::Stream { limb: 2 });
        ram.reset_pipe();
        assert_eq!(ram.tick(), None);
        assert_eq!(ram.tick(), None);
        assert_eq!(ram.word(2), 0x55);
    }

    #[test]
    fn test_unified_pages() {
        let mut mems = Memories::new(false, 1);
        mems.host_write(OperandPage::X, 0, 1);
        mems.host_write(OperandPage::Y, 0, 2);
        mems.host_write(OperandPage::Pprime, 63, 3);
        assert_eq!(mems.host_read(OperandPage::X, 0), 1);
        assert_eq!(mems.host_read(OperandPage::Y, 0), 2);
        assert_eq!(mems.host_read(OperandPage::Pprime, 63), 3);

        mems.store_tick();
        mems.issue_operand_read(OperandPage::Y, 0, ReadTag::Stream { limb: 0 });
        assert_eq!(mems.store_tick(), Some((ReadTag::Stream { limb: 0 }, 2)));
    }

    #[test]
    fn test_split_result_bank() {
        let mut mems = Memories::new(true, 1);
        mems.store_tick();
        mems.write_z(4, 0xbeef);
        assert_eq!(mems.host_read(OperandPage::Z, 4), 0xbeef);
        // The input bank is unaffected by result writes.
        assert_eq!(mems.host_read(OperandPage::P, 4), 0);
    }

    #[test]
    fn test_tram_pages_are_disjoint() {
        let mut mems = Memories::new(false, 1);
        mems.tram_tick();
        mems.write_tram(TramPage::S, 3, 0x11);
        mems.tram_tick();
        mems.write_tram(TramPage::Alpha, 3, 0x22);
        mems.tram_tick();
        mems.issue_tram_read(TramPage::S, 3, ReadTag::Resident { unit: 0 });
        assert_eq!(
            mems.tram_tick(),
            Some((ReadTag::Resident { unit: 0 }, 0x11))
        );
        mems.issue_tram_read(TramPage::Alpha, 3, ReadTag::Resident { unit: 1 });
        assert_eq!(
            mems.tram_tick(),
            Some((ReadTag::Resident { unit: 1 }, 0x22))
        );
    }
}

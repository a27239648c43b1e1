//! Paging memory manager.
//!
//! One shared RAM region and up to four swap devices back every
//! paging-enabled process. Each process owns a [`ProcessMem`] context:
//! its page table, its region table (register slot → allocated byte range),
//! and `Arc` handles to the shared physical regions. The context is only
//! ever touched by the thread currently holding the PCB; the shared frame
//! tables serialize themselves internally (see [`phys`]).
//!
//! Replacement policy: on a page fault with no free RAM frame, the victim
//! is the FIFO-oldest of the *faulting process's own* resident pages. The
//! policy is deterministic and keeps every page-table mutation inside the
//! faulting process's context; no other process's page table is touched.
//!
//! Dirty handling: a page is dirty once written. Clean pages are all-zero
//! by construction (frames and slots are zero-filled when claimed), so
//! migrating a clean page skips the data copy in both directions.

pub mod phys;

use std::collections::VecDeque;
use std::sync::Arc;

use crate::common::constants::{NUM_REGS, PAGE_SIZE};
use crate::common::error::MemError;
use crate::common::Pid;
use crate::config::MemoryConfig;

pub use phys::{MemPhy, PageOwner};

/// The shared physical memory of one simulation run: one RAM region plus
/// the configured swap devices (zero-sized slots are kept but never used).
#[derive(Debug, Clone)]
pub struct SystemMemory {
    /// The RAM region all resident pages live in.
    pub ram: Arc<MemPhy>,
    /// Swap devices, in configuration order.
    pub swaps: Vec<Arc<MemPhy>>,
}

impl SystemMemory {
    /// Builds the physical regions from a validated memory configuration.
    pub fn new(config: &MemoryConfig) -> Self {
        Self {
            ram: Arc::new(MemPhy::new(config.ram_bytes)),
            swaps: config
                .swap_bytes
                .iter()
                .map(|&bytes| Arc::new(MemPhy::new(bytes)))
                .collect(),
        }
    }
}

/// Where a mapped page currently lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Backing {
    /// Resident in the shared RAM region.
    Ram {
        /// RAM frame index.
        frame: usize,
    },
    /// Paged out to a swap device.
    Swapped {
        /// Swap device index.
        dev: usize,
        /// Slot (frame) index within the device.
        slot: usize,
    },
}

/// Page table entry: exactly one backing location, plus the dirty flag.
#[derive(Debug, Clone, Copy)]
struct Pte {
    backing: Backing,
    dirty: bool,
}

/// A register-bound allocation: a contiguous run of virtual pages.
#[derive(Debug, Clone, Copy)]
struct Region {
    start_page: usize,
    pages: usize,
    bytes: usize,
}

/// Per-process memory-management context.
#[derive(Debug)]
pub struct ProcessMem {
    pid: Pid,
    /// Virtual page number → entry. `None` is unmapped (never allocated, or
    /// freed). The address space grows by appending; freed runs leave holes.
    page_table: Vec<Option<Pte>>,
    regions: [Option<Region>; NUM_REGS],
    /// This process's resident pages, oldest first. Victim-selection order.
    resident_fifo: VecDeque<usize>,
    ram: Arc<MemPhy>,
    swaps: Vec<Arc<MemPhy>>,
    /// Swap device currently receiving this process's outgoing pages.
    active_swap: usize,
}

impl ProcessMem {
    /// Creates an empty context bound to the run's shared regions. The
    /// initial active swap device is the first one with any capacity.
    pub fn new(pid: Pid, memory: &SystemMemory) -> Self {
        let active_swap = memory
            .swaps
            .iter()
            .position(|s| s.frames() > 0)
            .unwrap_or(0);
        Self {
            pid,
            page_table: Vec::new(),
            regions: [None; NUM_REGS],
            resident_fifo: VecDeque::new(),
            ram: Arc::clone(&memory.ram),
            swaps: memory.swaps.iter().map(Arc::clone).collect(),
            active_swap,
        }
    }

    /// Grows the address space by the pages needed for `size` bytes and
    /// binds the new region to register `reg`.
    ///
    /// Each page prefers a free RAM frame and falls back to a slot in the
    /// active swap region. Exhausting RAM and every swap device fails the
    /// allocation with [`MemError::OutOfMemory`]; pages claimed before the
    /// failure stay mapped and are reclaimed when the context drops.
    pub fn alloc(&mut self, size: usize, reg: usize) -> Result<(), MemError> {
        if self.regions[reg].is_some() {
            return Err(MemError::RegionInUse { pid: self.pid, reg });
        }
        let pages = size.div_ceil(PAGE_SIZE).max(1);
        let start_page = self.page_table.len();
        for vpage in start_page..start_page + pages {
            let owner = PageOwner {
                pid: self.pid,
                vpage,
            };
            let backing = if let Some(frame) = self.ram.claim(owner) {
                self.resident_fifo.push_back(vpage);
                Backing::Ram { frame }
            } else if let Some((dev, slot)) = self.claim_swap_slot(owner) {
                Backing::Swapped { dev, slot }
            } else {
                return Err(MemError::OutOfMemory { pid: self.pid });
            };
            self.page_table.push(Some(Pte {
                backing,
                dirty: false,
            }));
        }
        self.regions[reg] = Some(Region {
            start_page,
            pages,
            bytes: size,
        });
        Ok(())
    }

    /// Releases the region bound to register `reg`, returning every page's
    /// frame or slot to its physical region.
    pub fn free(&mut self, reg: usize) -> Result<(), MemError> {
        let region = self.regions[reg]
            .take()
            .ok_or(MemError::BadRegister { pid: self.pid, reg })?;
        for vpage in region.start_page..region.start_page + region.pages {
            if let Some(pte) = self.page_table[vpage].take() {
                match pte.backing {
                    Backing::Ram { frame } => {
                        self.ram.release(frame);
                        self.resident_fifo.retain(|&p| p != vpage);
                    }
                    Backing::Swapped { dev, slot } => self.swaps[dev].release(slot),
                }
            }
        }
        Ok(())
    }

    /// Translates a virtual address to `(ram_frame, offset)`, servicing a
    /// page fault if the page is currently swapped out.
    pub fn translate(&mut self, vaddr: usize) -> Result<(usize, usize), MemError> {
        let vpage = vaddr / PAGE_SIZE;
        let offset = vaddr % PAGE_SIZE;
        let pte = self
            .page_table
            .get(vpage)
            .copied()
            .flatten()
            .ok_or(MemError::Segfault {
                pid: self.pid,
                addr: vaddr,
            })?;
        let frame = match pte.backing {
            Backing::Ram { frame } => frame,
            Backing::Swapped { .. } => self.page_fault(vpage)?,
        };
        Ok((frame, offset))
    }

    /// Reads the byte at a virtual address.
    pub fn read_vaddr(&mut self, vaddr: usize) -> Result<u8, MemError> {
        let (frame, offset) = self.translate(vaddr)?;
        Ok(self.ram.read_byte(frame, offset))
    }

    /// Writes the byte at a virtual address and marks its page dirty.
    pub fn write_vaddr(&mut self, vaddr: usize, value: u8) -> Result<(), MemError> {
        let (frame, offset) = self.translate(vaddr)?;
        self.ram.write_byte(frame, offset, value);
        let vpage = vaddr / PAGE_SIZE;
        if let Some(Some(pte)) = self.page_table.get_mut(vpage) {
            pte.dirty = true;
        }
        Ok(())
    }

    /// Reads `region(reg) + offset`, bounds-checked against the region.
    pub fn read_reg(&mut self, reg: usize, offset: usize) -> Result<u8, MemError> {
        let base = self.region_base(reg, offset)?;
        self.read_vaddr(base + offset)
    }

    /// Writes `region(reg) + offset`, bounds-checked against the region.
    pub fn write_reg(&mut self, reg: usize, offset: usize, value: u8) -> Result<(), MemError> {
        let base = self.region_base(reg, offset)?;
        self.write_vaddr(base + offset, value)
    }

    /// Number of this process's pages currently resident in RAM.
    pub fn resident_pages(&self) -> usize {
        self.resident_fifo.len()
    }

    /// Total mapped (allocated, unfreed) pages.
    pub fn mapped_pages(&self) -> usize {
        self.page_table.iter().filter(|p| p.is_some()).count()
    }

    /// Index of the swap device currently receiving evicted pages.
    pub fn active_swap(&self) -> usize {
        self.active_swap
    }

    fn region_base(&self, reg: usize, offset: usize) -> Result<usize, MemError> {
        let region = self.regions[reg].ok_or(MemError::BadRegister { pid: self.pid, reg })?;
        if offset >= region.bytes.max(1) {
            return Err(MemError::OutOfRegion {
                pid: self.pid,
                reg,
                offset,
            });
        }
        Ok(region.start_page * PAGE_SIZE)
    }

    /// Brings a swapped-out page into RAM, evicting one of this process's
    /// own resident pages if no frame is free. Returns the RAM frame now
    /// holding the page.
    fn page_fault(&mut self, vpage: usize) -> Result<usize, MemError> {
        let owner = PageOwner {
            pid: self.pid,
            vpage,
        };
        let Some(Some(pte)) = self.page_table.get(vpage).copied() else {
            unreachable!("page_fault on unmapped page");
        };
        let Backing::Swapped {
            dev: src_dev,
            slot: src_slot,
        } = pte.backing
        else {
            unreachable!("page_fault on resident page");
        };

        let frame = if let Some(frame) = self.ram.claim(owner) {
            frame
        } else {
            self.evict_oldest(owner)?
        };

        // Clean pages are all-zero; the claimed frame already is.
        if pte.dirty {
            let page = self.swaps[src_dev].copy_out(src_slot);
            self.ram.copy_in(frame, &page);
        }
        self.swaps[src_dev].release(src_slot);
        self.page_table[vpage] = Some(Pte {
            backing: Backing::Ram { frame },
            dirty: pte.dirty,
        });
        self.resident_fifo.push_back(vpage);
        Ok(frame)
    }

    /// Pages out this process's oldest resident page and hands its frame to
    /// `new_owner`, zero-filled.
    fn evict_oldest(&mut self, new_owner: PageOwner) -> Result<usize, MemError> {
        let victim = self
            .resident_fifo
            .pop_front()
            .ok_or(MemError::OutOfMemory { pid: self.pid })?;
        let Some(Some(victim_pte)) = self.page_table.get(victim).copied() else {
            unreachable!("resident fifo names an unmapped page");
        };
        let Backing::Ram { frame } = victim_pte.backing else {
            unreachable!("resident fifo names a swapped page");
        };

        let victim_owner = PageOwner {
            pid: self.pid,
            vpage: victim,
        };
        let Some((dev, slot)) = self.claim_swap_slot(victim_owner) else {
            // Nothing can be paged out: restore the fifo and report OOM.
            self.resident_fifo.push_front(victim);
            return Err(MemError::OutOfMemory { pid: self.pid });
        };
        if victim_pte.dirty {
            let page = self.ram.copy_out(frame);
            self.swaps[dev].copy_in(slot, &page);
        }
        self.page_table[victim] = Some(Pte {
            backing: Backing::Swapped { dev, slot },
            dirty: victim_pte.dirty,
        });
        self.ram.reassign(frame, new_owner);
        Ok(frame)
    }

    /// Claims a slot in the active swap device, advancing the active device
    /// to the next one with capacity when the current one fills up.
    fn claim_swap_slot(&mut self, owner: PageOwner) -> Option<(usize, usize)> {
        let count = self.swaps.len();
        if count == 0 {
            return None;
        }
        for step in 0..count {
            let dev = (self.active_swap + step) % count;
            if self.swaps[dev].frames() == 0 {
                continue;
            }
            if let Some(slot) = self.swaps[dev].claim(owner) {
                self.active_swap = dev;
                return Some((dev, slot));
            }
        }
        None
    }
}

impl Drop for ProcessMem {
    /// Returns every mapped page to its physical region. Retirement of a
    /// PCB is dropping it; no shared free routine exists.
    fn drop(&mut self) {
        for pte in self.page_table.iter_mut().filter_map(Option::take) {
            match pte.backing {
                Backing::Ram { frame } => self.ram.release(frame),
                Backing::Swapped { dev, slot } => self.swaps[dev].release(slot),
            }
        }
    }
}

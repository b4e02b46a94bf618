//! Born/die cell-stage coordinator
//!
//! Tracks, for every cell of the triangular born/die matrix, which storage
//! stage it is in and when it may be reclaimed, and schedules pairing work
//! between cells.
//!
//! ## Shared state
//!
//! ```text
//! appendable[cell]      ArcSwapOption  append-only handle, taken on conversion
//! sortable[cell]        ArcSwapOption  readable handle, CAS-installed once
//! cell_jobs[cell]       AtomicUsize    outstanding pairing jobs of the cell
//! row_bearing[row]      AtomicUsize    cells of the row with outstanding jobs
//! row_claimed[row + 1]  AtomicBool     cascade of the row has been claimed
//! lowest_bearing_row    AtomicI64      global cursor, starts at -1
//! ```
//!
//! There is no lock over stage transitions. A cell's stage is recomputed
//! from the cursor and its job counter on every call (see [`CellStage`]),
//! so readers never block and never observe a half-applied transition.
//!
//! ## Row-completion cascade
//!
//! When the last job of the last cell in row `r` completes, the thread that
//! observed the counter reach zero runs the cascade:
//!
//! ```text
//! 1. return unless the cursor still points at r and the row is unclaimed
//! 2. convert every cell of born column r+1 (take append handle, CAS sortable)
//! 3. clear the handles of row r
//! 4. CAS cursor r -> r+1; losers return
//! 5. r+1 final: CAS cursor to n+1 (Done), signal termination
//! 6. otherwise announce column r+1 and recheck row r+1's counter
//! ```
//!
//! Any number of workers may complete the "last" job of a row; exactly one
//! performs the promotion and none of them waits for another.

use crate::job::{BornDieController, PairingJob};
use arc_swap::ArcSwapOption;
use borndie_core::{Cell, CellStage, Error, PairingRule, Result, TriangularIndex};
use borndie_storage::{AppendableMemory, IndexableMemory, MemoryFactory};
use dashmap::DashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

/// Point-in-time counters of a coordinator.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CoordinatorMetrics {
    /// Append-only handles converted to sortable
    pub conversions: u64,
    /// Row-completion cascades performed (including row -1)
    pub cascades: u64,
    /// Jobs handed to the controller
    pub jobs_scheduled: u64,
    /// Jobs completed on the fast path because a side was empty
    pub jobs_skipped: u64,
    /// Jobs completed (scheduled and skipped)
    pub jobs_completed: u64,
    /// Columns reported as appended by completed jobs
    pub columns_appended: u64,
    /// Current cursor value
    pub lowest_bearing_row: i64,
    /// Whether the final row completed
    pub terminated: bool,
}

#[derive(Debug, Default)]
struct Counters {
    conversions: AtomicU64,
    cascades: AtomicU64,
    jobs_scheduled: AtomicU64,
    jobs_skipped: AtomicU64,
    jobs_completed: AtomicU64,
    columns_appended: AtomicU64,
}

/// Lock-free coordinator of cell stages and pairing work.
///
/// # Thread Safety
///
/// All methods take `&self` and may be called from any number of threads.
/// Handles returned by the getters stay valid while held, but a caller must
/// not cache them across stage changes: always ask again before reading.
pub struct BornDieCoordinator<F: MemoryFactory> {
    index: TriangularIndex,
    rule: PairingRule,
    factory: F,
    controller: Arc<dyn BornDieController>,
    appendable: Vec<ArcSwapOption<F::Append>>,
    sortable: Vec<ArcSwapOption<F::Sortable>>,
    cell_jobs: Vec<AtomicUsize>,
    row_bearing: Vec<AtomicUsize>,
    row_claimed: Vec<AtomicBool>,
    lowest_bearing_row: AtomicI64,
    pos_views: DashMap<(usize, usize), Arc<F::Sortable>>,
    counters: Counters,
}

impl<F: MemoryFactory> BornDieCoordinator<F> {
    /// Create a coordinator for `iterations` steps.
    ///
    /// Every cell and its append-only handle are created here. All cells
    /// start Accumulating; call
    /// [`notify_initial_column_complete`](Self::notify_initial_column_complete)
    /// once column 0 holds the initial modes.
    pub fn new(
        iterations: usize,
        factory: F,
        controller: Arc<dyn BornDieController>,
    ) -> Result<Self> {
        let index = TriangularIndex::new(iterations);
        let rule = PairingRule::new(index);

        let mut appendable = Vec::with_capacity(index.cell_count());
        let mut sortable = Vec::with_capacity(index.cell_count());
        let mut cell_jobs = Vec::with_capacity(index.cell_count());
        for cell in index.cells() {
            appendable.push(ArcSwapOption::from_pointee(factory.create_appendable(cell)?));
            sortable.push(ArcSwapOption::empty());
            cell_jobs.push(AtomicUsize::new(rule.partner_count(cell)?));
        }
        let row_bearing = (0..index.row_count())
            .map(|row| AtomicUsize::new(row + 1))
            .collect();
        // Slot 0 guards the cascade of the initial column (row -1).
        let row_claimed = (0..=index.row_count()).map(|_| AtomicBool::new(false)).collect();

        debug!(
            iterations,
            cells = index.cell_count(),
            "created born/die coordinator"
        );

        Ok(BornDieCoordinator {
            index,
            rule,
            factory,
            controller,
            appendable,
            sortable,
            cell_jobs,
            row_bearing,
            row_claimed,
            lowest_bearing_row: AtomicI64::new(-1),
            pos_views: DashMap::new(),
            counters: Counters::default(),
        })
    }

    /// Matrix geometry
    pub fn index(&self) -> &TriangularIndex {
        &self.index
    }

    /// Pairing geometry
    pub fn rule(&self) -> &PairingRule {
        &self.rule
    }

    /// Storage factory
    pub fn factory(&self) -> &F {
        &self.factory
    }

    /// Iteration count `n`
    pub fn iterations(&self) -> usize {
        self.index.iterations()
    }

    /// Current cursor; `-1` before the initial column completed.
    #[inline]
    pub fn lowest_bearing_row(&self) -> i64 {
        self.lowest_bearing_row.load(Ordering::SeqCst)
    }

    /// Check if the final row completed.
    pub fn is_terminated(&self) -> bool {
        self.lowest_bearing_row() > self.index.final_row() as i64
    }

    /// Outstanding jobs of `cell`
    pub fn jobs_remaining(&self, cell: Cell) -> Result<usize> {
        let slot = self.index.cell_index(cell)?;
        Ok(self.cell_jobs[slot].load(Ordering::SeqCst))
    }

    /// Current stage of `cell`, recomputed from the atomics.
    pub fn stage(&self, cell: Cell) -> Result<CellStage> {
        let slot = self.index.cell_index(cell)?;
        Ok(self.stage_at(cell, slot))
    }

    #[inline]
    fn stage_at(&self, cell: Cell, slot: usize) -> CellStage {
        // Counter before cursor: a zero counter observed with a stale
        // cursor can only under-report progress, never skip a stage.
        let jobs = self.cell_jobs[slot].load(Ordering::SeqCst);
        CellStage::compute(cell, self.lowest_bearing_row(), jobs)
    }

    // ========================================================================
    // Handle access
    // ========================================================================

    /// Append-only handle of an Accumulating cell
    pub fn get_for_appending(&self, cell: Cell) -> Result<Arc<F::Append>> {
        let slot = self.index.cell_index(cell)?;
        let stage = self.stage_at(cell, slot);
        if stage != CellStage::Accumulating {
            return Err(Error::stage_violation(cell, "Accumulating", stage));
        }
        self.appendable[slot]
            .load_full()
            .ok_or_else(|| Error::stage_violation(cell, "Accumulating", self.stage_at(cell, slot)))
    }

    /// Readable handle of an active cell, used as the dying side of a job
    pub fn get_neg_for_generating(&self, cell: Cell) -> Result<Arc<F::Sortable>> {
        let slot = self.index.cell_index(cell)?;
        self.active_handle(cell, slot)
    }

    /// Readable handle of an active cell, specialised for pairing with an
    /// owner that dies at `partner_die_row`.
    ///
    /// Views are cached per `(cell, partner_die_row)` until the cell's row
    /// is discarded.
    pub fn get_pos_for_generating(
        &self,
        cell: Cell,
        partner_die_row: usize,
    ) -> Result<Arc<F::Sortable>> {
        let slot = self.index.cell_index(cell)?;
        if partner_die_row >= cell.die {
            return Err(Error::InvalidArgument(format!(
                "cell {} survives only past rows below {}, got partner row {}",
                cell, cell.die, partner_die_row
            )));
        }
        let memory = self.active_handle(cell, slot)?;
        let key = (slot, partner_die_row);
        if let Some(view) = self.pos_views.get(&key) {
            return Ok(Arc::clone(view.value()));
        }

        let view = self
            .pos_views
            .entry(key)
            .or_try_insert_with(|| self.factory.pos_view(cell, &memory, partner_die_row))?
            .value()
            .clone();

        // The row may have been discarded while the view was built.
        let stage = self.stage_at(cell, slot);
        if !stage.is_active() {
            self.pos_views.remove(&key);
            return Err(Error::stage_violation(cell, "Bearing or Collaborating", stage));
        }
        Ok(view)
    }

    /// Final-row handle of born column `born`; the run must have terminated.
    pub fn get_final(&self, born: usize) -> Result<Arc<F::Sortable>> {
        let cell = self.index.cell(born, self.index.final_row())?;
        let slot = self.index.cell_index(cell)?;
        let stage = self.stage_at(cell, slot);
        if stage != CellStage::Done {
            return Err(Error::stage_violation(cell, "Done", stage));
        }
        self.sortable[slot]
            .load_full()
            .ok_or_else(|| Error::Internal(format!("final cell {} has no storage", cell)))
    }

    /// Number of columns in `cell`, read from the handle of its stage.
    pub fn column_count(&self, cell: Cell) -> Result<usize> {
        let slot = self.index.cell_index(cell)?;
        match self.stage_at(cell, slot) {
            CellStage::Accumulating => match self.appendable[slot].load_full() {
                Some(memory) => AppendableMemory::column_count(&*memory),
                // Conversion took the append handle; the cursor has not moved yet.
                None => match self.sortable[slot].load_full() {
                    Some(memory) => memory.column_count(),
                    None => Err(Error::Converting(cell)),
                },
            },
            CellStage::Bearing | CellStage::Collaborating => self.readable_count(cell, slot),
            CellStage::Done if self.index.is_final_row(cell.die) => {
                self.readable_count(cell, slot)
            }
            stage => Err(Error::stage_violation(
                cell,
                "a stage with live storage",
                stage,
            )),
        }
    }

    /// Check if `cell` holds no columns.
    pub fn is_empty(&self, cell: Cell) -> Result<bool> {
        Ok(self.column_count(cell)? == 0)
    }

    fn readable_count(&self, cell: Cell, slot: usize) -> Result<usize> {
        match self.sortable[slot].load_full() {
            Some(memory) => memory.column_count(),
            // Between take and install of a conversion, or after discard.
            None => Err(Error::stage_violation(
                cell,
                "a stage with live storage",
                self.stage_at(cell, slot),
            )),
        }
    }

    fn active_handle(&self, cell: Cell, slot: usize) -> Result<Arc<F::Sortable>> {
        let stage = self.stage_at(cell, slot);
        if !stage.is_active() {
            return Err(Error::stage_violation(cell, "Bearing or Collaborating", stage));
        }
        self.sortable[slot].load_full().ok_or_else(|| {
            Error::stage_violation(cell, "Bearing or Collaborating", self.stage_at(cell, slot))
        })
    }

    // ========================================================================
    // Scheduling
    // ========================================================================

    /// Issue the jobs of `owner` whose partners are born in
    /// `[active_born_from, active_born_to]`.
    ///
    /// Partners that are empty (or an empty owner) complete immediately with
    /// zero effort instead of being queued. Returns the number of jobs
    /// handed to the controller.
    pub fn schedule_pairing_jobs(
        &self,
        owner: Cell,
        active_born_from: usize,
        active_born_to: usize,
    ) -> Result<usize> {
        let partners = self
            .rule
            .owner_partners(owner, active_born_from, active_born_to)?;
        let slot = self.index.cell_index(owner)?;
        let stage = self.stage_at(owner, slot);
        if stage != CellStage::Bearing {
            return Err(Error::stage_violation(owner, "Bearing", stage));
        }
        let cursor = self.lowest_bearing_row();
        if !partners.is_empty() && partners.born_to as i64 > cursor {
            return Err(Error::InvalidArgument(format!(
                "born columns up to {} requested but only {} is active",
                partners.born_to, cursor
            )));
        }

        let owner_empty = self.is_empty(owner)?;
        let mut scheduled = 0;
        for partner in partners.cells() {
            let job = PairingJob::new(owner, partner);
            if owner_empty || self.is_empty(partner)? {
                self.counters.jobs_skipped.fetch_add(1, Ordering::Relaxed);
                self.complete_job(job, 0)?;
            } else {
                self.counters.jobs_scheduled.fetch_add(1, Ordering::Relaxed);
                self.controller.submit(job);
                scheduled += 1;
            }
        }
        debug!(%owner, active_born_from, active_born_to, scheduled, "scheduled pairing jobs");
        Ok(scheduled)
    }

    /// Issue every job unlocked by born column `column` becoming active.
    ///
    /// A pair is unlocked by the later of its two born columns, so each pair
    /// is issued by exactly one activation:
    /// - owners born in `column` pair with partners born in `0..=column`
    /// - owners born before `column` pair with partners born in `column`
    pub fn schedule_active_column(&self, column: usize) -> Result<usize> {
        let final_row = self.index.final_row();
        if column >= final_row {
            return Err(Error::InvalidArgument(format!(
                "column {} has no pairing jobs in a run of {} iterations",
                column, final_row
            )));
        }
        let mut scheduled = 0;
        for die in column..final_row {
            scheduled += self.schedule_pairing_jobs(Cell::new(column, die), 0, column)?;
            for born in 0..column {
                scheduled += self.schedule_pairing_jobs(Cell::new(born, die), column, column)?;
            }
        }
        Ok(scheduled)
    }

    // ========================================================================
    // Completion and cascade
    // ========================================================================

    /// Record completion of `job`, which appended `appended` new columns.
    pub fn notify_pairing_job_completed(&self, job: PairingJob, appended: usize) -> Result<()> {
        self.index.check(job.owner)?;
        self.index.check(job.partner)?;
        self.complete_job(job, appended)
    }

    /// Column 0 holds all initial modes: complete "row -1".
    pub fn notify_initial_column_complete(&self) -> Result<()> {
        if !self.cascade(-1)? {
            return Err(Error::InvalidArgument(
                "initial column already completed".to_string(),
            ));
        }
        Ok(())
    }

    fn complete_job(&self, job: PairingJob, appended: usize) -> Result<()> {
        let owner = job.owner;
        let slot = self.index.cell_index(owner)?;
        let previous = self.cell_jobs[slot]
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |jobs| jobs.checked_sub(1))
            .map_err(|_| {
                Error::Internal(format!("completion of {} but {} owns no open jobs", job, owner))
            })?;
        self.counters.jobs_completed.fetch_add(1, Ordering::Relaxed);
        self.counters
            .columns_appended
            .fetch_add(appended as u64, Ordering::Relaxed);

        if previous != 1 {
            return Ok(());
        }
        let remaining_in_row = self.row_bearing[owner.die]
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |cells| cells.checked_sub(1))
            .map_err(|_| Error::Internal(format!("row {} bearing counter underflow", owner.die)))?
            - 1;
        debug!(%owner, remaining_in_row, "cell finished bearing");
        if remaining_in_row == 0 {
            self.cascade(owner.die as i64)?;
        }
        Ok(())
    }

    /// Row-completion cascade starting at `row`. Returns whether this call
    /// performed at least one promotion.
    fn cascade(&self, mut row: i64) -> Result<bool> {
        let final_row = self.index.final_row() as i64;
        let mut promoted = false;
        loop {
            if self.lowest_bearing_row() != row {
                return Ok(promoted);
            }
            let claim = &self.row_claimed[(row + 1) as usize];
            if claim
                .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
                .is_err()
            {
                return Ok(promoted);
            }
            self.counters.cascades.fetch_add(1, Ordering::Relaxed);

            let next = row + 1;
            self.convert_column(next as usize)?;
            if row >= 0 {
                self.discard_row(row as usize)?;
            }

            if self
                .lowest_bearing_row
                .compare_exchange(row, next, Ordering::SeqCst, Ordering::SeqCst)
                .is_err()
            {
                return Err(Error::Internal(format!(
                    "cursor left row {} while its claimed cascade ran",
                    row
                )));
            }
            promoted = true;

            if next == final_row {
                if self
                    .lowest_bearing_row
                    .compare_exchange(next, next + 1, Ordering::SeqCst, Ordering::SeqCst)
                    .is_ok()
                {
                    self.pos_views.clear();
                    info!(final_row, "final row completed, enumeration terminated");
                    self.controller.terminated();
                }
                return Ok(promoted);
            }

            info!(column = next, "born column active");
            self.controller.born_column_activated(next as usize);

            if self.row_bearing[next as usize].load(Ordering::SeqCst) != 0 {
                return Ok(promoted);
            }
            row = next;
        }
    }

    fn convert_column(&self, column: usize) -> Result<()> {
        for cell in self.index.column_cells(column)? {
            let slot = self.index.cell_index(cell)?;
            let Some(append) = self.appendable[slot].swap(None) else {
                continue;
            };
            let sortable = Arc::new(self.factory.convert(cell, &append)?);
            let previous = self.sortable[slot].compare_and_swap(&None::<Arc<F::Sortable>>, Some(sortable));
            if previous.is_some() {
                return Err(Error::Internal(format!("cell {} converted twice", cell)));
            }
            self.counters.conversions.fetch_add(1, Ordering::Relaxed);
        }
        debug!(column, "converted born column");
        Ok(())
    }

    fn discard_row(&self, row: usize) -> Result<()> {
        let slots = self.index.row_range(row)?;
        for slot in slots.clone() {
            self.appendable[slot].store(None);
            self.sortable[slot].store(None);
        }
        self.pos_views.retain(|(slot, _), _| !slots.contains(slot));
        debug!(row, "discarded completed row");
        Ok(())
    }

    /// Snapshot of the coordinator's counters
    pub fn metrics(&self) -> CoordinatorMetrics {
        CoordinatorMetrics {
            conversions: self.counters.conversions.load(Ordering::Relaxed),
            cascades: self.counters.cascades.load(Ordering::Relaxed),
            jobs_scheduled: self.counters.jobs_scheduled.load(Ordering::Relaxed),
            jobs_skipped: self.counters.jobs_skipped.load(Ordering::Relaxed),
            jobs_completed: self.counters.jobs_completed.load(Ordering::Relaxed),
            columns_appended: self.counters.columns_appended.load(Ordering::Relaxed),
            lowest_bearing_row: self.lowest_bearing_row(),
            terminated: self.is_terminated(),
        }
    }
}

impl<F: MemoryFactory> fmt::Debug for BornDieCoordinator<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BornDieCoordinator")
            .field("iterations", &self.iterations())
            .field("lowest_bearing_row", &self.lowest_bearing_row())
            .field("cached_pos_views", &self.pos_views.len())
            .finish()
    }
}

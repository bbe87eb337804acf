//! One replication of the stroke pathway.
//!
//! The [`Model`] owns the virtual clock, the four resource pools, the random
//! streams and every patient it creates. Processes (arrivals, downtime,
//! patient pathways, the day tick) are explicit state machines woken by
//! [`Event`]s; a process only suspends on a timed delay or on a pool request,
//! and everything between two suspensions runs inside one event dispatch.

use serde::Serialize;
use strokeflow_sim::{
    Grant, Priority, ResourcePool, RunMetrics, SimTime, SimWorld, StreamSet, UnitId,
    MINUTES_PER_DAY,
};
use tracing::{debug, info, instrument, trace};

use crate::{
    config::ModelConfig,
    downtime::Downtime,
    error::{ModelError, ModelResult},
    pathway::Stage,
    patient::{ArrivalWindow, Patient, PatientId},
    results::RunResults,
    streams::{Samplers, PROVISIONED_STREAMS},
};

/// A resource whose daily availability is restricted by a downtime process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Obstruction {
    /// Advanced (perfusion) CT scanner.
    AdvancedScanner,
    /// Same-day emergency care unit.
    Sdec,
}

impl Obstruction {
    /// Pool seized while the resource is closed.
    pub fn pool(self) -> PoolKind {
        match self {
            Obstruction::AdvancedScanner => PoolKind::AdvancedScanner,
            Obstruction::Sdec => PoolKind::SdecBed,
        }
    }
}

/// The four pools of a replication.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum PoolKind {
    /// Stroke nurses.
    Nurse,
    /// Advanced CT scanners.
    AdvancedScanner,
    /// SDEC beds.
    SdecBed,
    /// Ward beds.
    WardBed,
}

/// Who asked for a pool unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Requester {
    /// A patient pathway.
    Patient(PatientId),
    /// A downtime process closing its resource.
    Downtime(Obstruction),
}

/// Wake-ups dispatched by the replication's event loop.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// An arrival process's sampled gap has elapsed.
    Arrival(ArrivalWindow),
    /// A patient's timed activity has finished.
    Wake(PatientId),
    /// A pool unit has been handed to a requester.
    Granted {
        /// Pool the unit belongs to.
        pool: PoolKind,
        /// The grant itself.
        grant: Grant<Requester>,
    },
    /// A downtime process's delay has elapsed.
    Downtime(Obstruction),
    /// Midnight.
    DayTick,
}

/// A point on an occupancy time series.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OccupancySample {
    /// Replication index.
    pub run: u32,
    /// When the sample was taken.
    pub time: SimTime,
    /// Head count: patients holding the resource, or waiting in its queue
    /// for the nurse-queue series.
    pub occupancy: usize,
    /// Whether the sample falls inside the warm-up period.
    pub during_warm_up: bool,
}

#[derive(Debug)]
pub(crate) struct Pools {
    pub(crate) nurses: ResourcePool<Requester>,
    pub(crate) scanners: ResourcePool<Requester>,
    pub(crate) sdec_beds: ResourcePool<Requester>,
    pub(crate) ward_beds: ResourcePool<Requester>,
}

impl Pools {
    fn new(config: &ModelConfig) -> ModelResult<Self> {
        let caps = &config.capacities;
        Ok(Self {
            nurses: ResourcePool::new("nurse", caps.nurses)?,
            scanners: ResourcePool::new("advanced_scanner", caps.advanced_scanners)?,
            sdec_beds: ResourcePool::new("sdec_bed", caps.sdec_beds)?,
            ward_beds: ResourcePool::new("ward_bed", caps.ward_beds)?,
        })
    }

    pub(crate) fn get(&self, kind: PoolKind) -> &ResourcePool<Requester> {
        match kind {
            PoolKind::Nurse => &self.nurses,
            PoolKind::AdvancedScanner => &self.scanners,
            PoolKind::SdecBed => &self.sdec_beds,
            PoolKind::WardBed => &self.ward_beds,
        }
    }

    fn get_mut(&mut self, kind: PoolKind) -> &mut ResourcePool<Requester> {
        match kind {
            PoolKind::Nurse => &mut self.nurses,
            PoolKind::AdvancedScanner => &mut self.scanners,
            PoolKind::SdecBed => &mut self.sdec_beds,
            PoolKind::WardBed => &mut self.ward_beds,
        }
    }
}

/// Everything harvested from a finished replication.
#[derive(Debug, Clone)]
pub struct RunOutput {
    /// Run-level KPIs.
    pub results: RunResults,
    /// Every patient created, in arrival order.
    pub patients: Vec<Patient>,
    /// Ward occupancy time series.
    pub ward_audit: Vec<OccupancySample>,
    /// SDEC occupancy time series.
    pub sdec_audit: Vec<OccupancySample>,
    /// Patients waiting for a nurse, sampled whenever a nurse is granted.
    pub nurse_queue_audit: Vec<OccupancySample>,
    /// Engine counters.
    pub metrics: RunMetrics,
}

/// A single replication.
#[derive(Debug)]
pub struct Model {
    pub(crate) config: ModelConfig,
    pub(crate) replication: u32,
    seed: u64,
    pub(crate) world: SimWorld<Event>,
    pub(crate) samplers: Samplers,
    pub(crate) pools: Pools,
    pub(crate) patients: Vec<Patient>,
    pub(crate) stages: Vec<Stage>,
    pub(crate) scanner_downtime: Downtime,
    pub(crate) sdec_downtime: Downtime,
    pub(crate) sdec_occupancy: usize,
    pub(crate) ward_audit: Vec<OccupancySample>,
    pub(crate) sdec_audit: Vec<OccupancySample>,
    pub(crate) nurse_queue_audit: Vec<OccupancySample>,
    days_elapsed: u64,
    started: bool,
}

impl Model {
    /// Builds replication `replication` of `config`.
    ///
    /// The configuration is validated and cloned, so the caller's snapshot is
    /// never shared with the running replication.
    pub fn new(config: &ModelConfig, replication: u32) -> ModelResult<Self> {
        config.validate()?;
        let mut streams =
            StreamSet::new(config.master_seed, u64::from(replication), PROVISIONED_STREAMS)?;
        let samplers = Samplers::new(config, &mut streams)?;
        let pools = Pools::new(config)?;
        Ok(Self {
            scanner_downtime: Downtime::new(
                Obstruction::AdvancedScanner,
                config.advanced_ct.schedule(config.sim_duration),
            ),
            sdec_downtime: Downtime::new(
                Obstruction::Sdec,
                config.sdec.schedule(config.sim_duration),
            ),
            config: config.clone(),
            replication,
            seed: streams.seed(),
            world: SimWorld::new(),
            samplers,
            pools,
            patients: Vec::new(),
            stages: Vec::new(),
            sdec_occupancy: 0,
            ward_audit: Vec::new(),
            sdec_audit: Vec::new(),
            nurse_queue_audit: Vec::new(),
            days_elapsed: 0,
            started: false,
        })
    }

    /// Runs until warm-up plus the reported duration has elapsed and harvests
    /// the results.
    #[instrument(skip_all, fields(replication = self.replication))]
    pub fn run(mut self) -> ModelResult<RunOutput> {
        info!(seed = self.seed, "replication starting");
        let until = self.config.run_until();
        self.advance_to(until)?;

        let metrics = self.world.metrics();
        let results = RunResults::from_replication(
            &self.config,
            self.replication,
            &self.patients,
            &self.sdec_downtime,
            &self.scanner_downtime,
        );
        info!(
            patients = self.patients.len(),
            events = metrics.events_processed,
            "replication complete"
        );
        Ok(RunOutput {
            results,
            patients: self.patients,
            ward_audit: self.ward_audit,
            sdec_audit: self.sdec_audit,
            nurse_queue_audit: self.nurse_queue_audit,
            metrics,
        })
    }

    fn start(&mut self) -> ModelResult<()> {
        self.started = true;
        for window in [ArrivalWindow::InHours, ArrivalWindow::OutOfHours] {
            self.start_arrivals(window)?;
        }
        for obstruction in [Obstruction::AdvancedScanner, Obstruction::Sdec] {
            let offset = self.downtime(obstruction).first_wake();
            self.world.schedule(Event::Downtime(obstruction), offset)?;
        }
        self.world.schedule(Event::DayTick, MINUTES_PER_DAY)?;
        Ok(())
    }

    fn dispatch(&mut self, event: Event) -> ModelResult<()> {
        trace!(now = self.world.now(), ?event, "dispatch");
        match event {
            Event::Arrival(window) => self.on_arrival(window),
            Event::Wake(id) => self.on_patient_wake(id),
            Event::Granted { pool, grant } => match grant.requester {
                Requester::Patient(id) => self.on_patient_granted(id, pool, grant.unit),
                Requester::Downtime(obstruction) => {
                    self.on_downtime_granted(obstruction, grant.unit)
                }
            },
            Event::Downtime(obstruction) => self.on_downtime_wake(obstruction),
            Event::DayTick => {
                self.days_elapsed += 1;
                debug!("day {}", self.days_elapsed);
                self.world.schedule(Event::DayTick, MINUTES_PER_DAY)?;
                Ok(())
            }
        }
    }

    /// Asks `pool` for a unit; an immediate grant is delivered as an event at
    /// the current instant.
    pub(crate) fn request(
        &mut self,
        pool: PoolKind,
        requester: Requester,
        priority: Priority,
    ) -> ModelResult<()> {
        if let Some(grant) = self.pools.get_mut(pool).request(requester, priority) {
            self.world.schedule(Event::Granted { pool, grant }, 0.0)?;
        }
        Ok(())
    }

    /// Returns `unit`, passing it straight on to the next queued requester.
    pub(crate) fn release(&mut self, pool: PoolKind, unit: UnitId) -> ModelResult<()> {
        if let Some(grant) = self.pools.get_mut(pool).release(unit)? {
            self.world.schedule(Event::Granted { pool, grant }, 0.0)?;
        }
        Ok(())
    }

    pub(crate) fn downtime(&self, obstruction: Obstruction) -> &Downtime {
        match obstruction {
            Obstruction::AdvancedScanner => &self.scanner_downtime,
            Obstruction::Sdec => &self.sdec_downtime,
        }
    }

    pub(crate) fn downtime_mut(&mut self, obstruction: Obstruction) -> &mut Downtime {
        match obstruction {
            Obstruction::AdvancedScanner => &mut self.scanner_downtime,
            Obstruction::Sdec => &mut self.sdec_downtime,
        }
    }

    pub(crate) fn patient_mut(&mut self, id: PatientId) -> ModelResult<&mut Patient> {
        id.checked_sub(1)
            .and_then(|i| usize::try_from(i).ok())
            .and_then(|i| self.patients.get_mut(i))
            .ok_or(ModelError::UnknownPatient(id))
    }

    pub(crate) fn stage(&self, id: PatientId) -> ModelResult<Stage> {
        id.checked_sub(1)
            .and_then(|i| usize::try_from(i).ok())
            .and_then(|i| self.stages.get(i))
            .copied()
            .ok_or(ModelError::UnknownPatient(id))
    }

    pub(crate) fn set_stage(&mut self, id: PatientId, stage: Stage) -> ModelResult<()> {
        let slot = id
            .checked_sub(1)
            .and_then(|i| usize::try_from(i).ok())
            .and_then(|i| self.stages.get_mut(i))
            .ok_or(ModelError::UnknownPatient(id))?;
        *slot = stage;
        Ok(())
    }

    pub(crate) fn in_warm_up(&self) -> bool {
        self.world.now() < self.config.warm_up_period
    }

    pub(crate) fn audit(&mut self, pool: PoolKind) {
        let during_warm_up = self.in_warm_up();
        let (occupancy, series) = match pool {
            PoolKind::WardBed => (self.pools.ward_beds.in_use(), &mut self.ward_audit),
            PoolKind::SdecBed => (self.sdec_occupancy, &mut self.sdec_audit),
            PoolKind::Nurse => (self.pools.nurses.queue_len(), &mut self.nurse_queue_audit),
            PoolKind::AdvancedScanner => return,
        };
        series.push(OccupancySample {
            run: self.replication,
            time: self.world.now(),
            occupancy,
            during_warm_up,
        });
    }

    /// Units held in `pool` right now.
    pub fn in_use(&self, pool: PoolKind) -> usize {
        self.pools.get(pool).in_use()
    }

    /// Whether the obstructed resource is currently open.
    pub fn is_available(&self, obstruction: Obstruction) -> bool {
        self.downtime(obstruction).is_open()
    }

    /// Current virtual time.
    pub fn now(&self) -> SimTime {
        self.world.now()
    }

    /// Patients created so far.
    pub fn patients(&self) -> &[Patient] {
        &self.patients
    }

    /// Processes every event strictly before `horizon` and parks the clock
    /// there, starting the processes on first use.
    ///
    /// Lets callers observe the replication mid-run; [`Model::run`] is the
    /// usual entry point.
    pub fn advance_to(&mut self, horizon: SimTime) -> ModelResult<()> {
        if !self.started {
            self.start()?;
        }
        while let Some(event) = self.world.next_until(horizon) {
            self.dispatch(event)?;
        }
        Ok(())
    }
}

//! # Plant Care Executable
//!
//! Runs the greenhouse automation core against the simulated equipment:
//! - Periodic water cycles over the bed, returning the scan axis home after each
//! - Periodic bed rotations, alternating direction
//! - User statistics and shut down buttons, and the emergency stop
//!
//! Each cycle dispatched is archived to `arch/cycles.csv` in the session directory, and the final
//! report is saved alongside the log.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

// External
use color_eyre::{eyre::WrapErr, Result};
use eqpt_if::Settings;
use log::{error, info};

// Internal
use care_lib::{
    params::Params,
    report::SessionReporter,
    scheduler::Scheduler,
    sim::{SimEqpt, SimParams},
};
use util::{
    archive::Archiver,
    host,
    logger::{logger_init, LevelFilter},
    session::Session,
};

// ------------------------------------------------------------------------------------------------
// MAIN
// ------------------------------------------------------------------------------------------------

fn main() -> Result<()> {
    color_eyre::install()?;

    // ---- EARLY INITIALISATION ----

    // Initialise session
    let session = Session::new("care_exec", "sessions").wrap_err("Failed to create the session")?;

    // Initialise logger
    logger_init(LevelFilter::Debug, &session).wrap_err("Failed to initialise logging")?;

    // Log information on this execution.
    info!("Plant Care Executable\n");
    info!("Running on: {}", host::platform());
    info!("Session directory: {:?}\n", session.session_root);

    info!("Initialising...");

    // ---- LOAD PARAMETERS ----

    let params: Params =
        util::params::load("care_exec.toml").wrap_err("Failed to load the care parameters")?;
    params
        .are_valid()
        .wrap_err("Invalid care parameters")?;

    let settings: Settings =
        util::params::load("settings.toml").wrap_err("Failed to load the user settings")?;

    let sim_params: SimParams =
        util::params::load("sim.toml").wrap_err("Failed to load the simulation parameters")?;

    info!("Parameters loaded");

    // ---- SCHEDULER INITIALISATION ----

    let arch = Archiver::from_path(&session, "cycles.csv")
        .wrap_err("Failed to open the cycle archive")?;

    let state = {
        let mut scheduler = Scheduler::new(
            SimEqpt::new(sim_params),
            SessionReporter::new(&session),
            params,
            settings,
        )
        .with_archive(arch);

        info!("Initialisation complete, entering main loop");

        // ---- MAIN LOOP ----

        scheduler.run()
    };

    // ---- SHUTDOWN ----

    session.exit();

    if let Err(e) = state.result() {
        error!("{}", e);
        return Err(e.into());
    }

    info!("Run ended normally");

    Ok(())
}

use std::io::Write;

use clap::Parser;
use env_logger::Builder;
use log::error;

use cloudsim_core::simulation::Simulation;
use cloudsim_iaas::core::cloudlet::{Cloudlet, CloudletReport};
use cloudsim_iaas::core::cloudlet_scheduler::cloudlet_scheduler_resolver;
use cloudsim_iaas::core::config::sim_config::{HostConfig, SimulationConfig};
use cloudsim_iaas::core::error::SimulationError;
use cloudsim_iaas::core::utilization_model::utilization_model_resolver;
use cloudsim_iaas::core::vm::Vm;
use cloudsim_iaas::simulation::CloudSimulation;

#[derive(Parser, Debug)]
#[clap(about, long_about = None)]
struct Args {
    /// Simulation config file, a single host with one 1000 MIPS core is used if omitted
    #[clap(short, long)]
    config: Option<String>,

    /// Number of cloudlets
    #[clap(short = 'n', long, default_value = "1")]
    cloudlets: u32,

    /// Cloudlet length in MI
    #[clap(short, long, default_value = "40000")]
    length: f64,

    /// CPU utilization model of cloudlets: Full, Constant[utilization=..] or Stochastic[seed=..]
    #[clap(short, long, default_value = "Full")]
    utilization: String,

    /// Cloudlet scheduler of the VM: TimeShared or SpaceShared
    #[clap(long, default_value = "TimeShared")]
    scheduler: String,

    /// Print results as JSON
    #[clap(long)]
    json: bool,
}

fn init_logger() {
    Builder::from_default_env()
        .format(|buf, record| writeln!(buf, "{}", record.args()))
        .init();
}

fn default_config() -> SimulationConfig {
    SimulationConfig {
        hosts: vec![HostConfig {
            pes: 1,
            mips: 1000.,
            ram: 2048,
            bw: 10000,
            storage: 1000000,
            count: None,
        }],
        ..SimulationConfig::default()
    }
}

fn run(args: &Args) -> Result<Vec<CloudletReport>, SimulationError> {
    let sim_config = match &args.config {
        Some(path) => SimulationConfig::from_file(path)?,
        None => default_config(),
    };
    let mut cloud_sim = CloudSimulation::new(Simulation::new(), sim_config);
    let dc = cloud_sim.add_datacenter_from_config("datacenter_0")?;
    let broker = cloud_sim.add_broker("broker", dc);

    let vm = Vm::new(0, 1000., 1, 512, 1000, 10000, "Xen", cloudlet_scheduler_resolver(&args.scheduler)?);
    let mut cloudlets = Vec::new();
    for id in 0..args.cloudlets {
        cloudlets.push(Cloudlet::new(id, args.length, 1, 300, 300).with_utilization_models(
            utilization_model_resolver(&args.utilization)?,
            utilization_model_resolver("Full")?,
            utilization_model_resolver("Full")?,
        ));
    }
    cloud_sim.broker(broker).borrow_mut().submit_vm_list(vec![vm]);
    cloud_sim.broker(broker).borrow_mut().submit_cloudlet_list(cloudlets);

    cloud_sim.run()?;

    let reports = cloud_sim
        .broker(broker)
        .borrow()
        .get_cloudlet_received_list()
        .iter()
        .map(|cloudlet| cloudlet.report())
        .collect();
    Ok(reports)
}

fn main() {
    init_logger();
    let args = Args::parse();

    let reports = match run(&args) {
        Ok(reports) => reports,
        Err(e) => {
            error!("simulation failed: {}", e);
            std::process::exit(1);
        }
    };

    if args.json {
        match serde_json::to_string_pretty(&reports) {
            Ok(json) => println!("{}", json),
            Err(e) => error!("can't serialize results: {}", e),
        }
    } else {
        println!(
            "{:>6} {:>9} {:>4} {:>4} {:>8} {:>8} {:>8}",
            "id", "status", "dc", "vm", "time", "start", "finish"
        );
        for report in reports.iter() {
            println!("{}", report);
        }
    }
}

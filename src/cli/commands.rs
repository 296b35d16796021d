//! Command dispatch: load the catalog, run one command, save when it changed.

use std::io;

use chrono::{Local, NaiveDateTime};
use clap::CommandFactory;
use clap_complete::generate;
use tracing::{debug, instrument};

use crate::application::services::NewComponent;
use crate::cli::args::{Cli, Commands, ConfigCommands, OperationCommands};
use crate::cli::output;
use crate::cli::{CliError, CliResult};
use crate::config::{global_config_path, Settings};
use crate::domain::{
    AssignedToOperation, Catalog, EntityId, Field, FieldValue, Operation, StructureUsage,
};
use crate::infrastructure::di::ServiceContainer;
use crate::tree_traits::TreeNodeConvert;

pub fn execute_command(cli: &Cli) -> CliResult<()> {
    let Some(command) = &cli.command else {
        return Err(CliError::Usage("no command given, see --help".into()));
    };

    if let Commands::Completion { shell } = command {
        let mut cmd = Cli::command();
        let name = cmd.get_name().to_string();
        generate(*shell, &mut cmd, name, &mut io::stdout());
        return Ok(());
    }

    let mut settings = Settings::load(cli.config.as_deref())?;
    if let Some(store) = &cli.store {
        settings.store = crate::config::expand_path(store);
    }
    let container = ServiceContainer::new(settings);

    if let Commands::Config { command } = command {
        return config_command(&container, command);
    }

    let store_path = container.settings.store.clone();
    let mut catalog = container.store.load(&store_path)?;
    let changed = run(&container, &mut catalog, command, Local::now().naive_local())?;
    if changed {
        container.store.save(&store_path, &catalog)?;
        debug!("saved catalog to {}", store_path.display());
    }
    Ok(())
}

/// Runs a catalog command. Returns whether the catalog needs saving.
#[instrument(level = "debug", skip(container, catalog))]
fn run(
    container: &ServiceContainer,
    catalog: &mut Catalog,
    command: &Commands,
    now: NaiveDateTime,
) -> CliResult<bool> {
    let service = &container.technology_service;

    match command {
        Commands::Init { number, product } => {
            let id = catalog.create_technology(number, product.map(EntityId))?;
            output::action("Created technology", &format!("{} (id {})", number, id));
            Ok(true)
        }
        Commands::Operation { command } => operation_command(catalog, command),
        Commands::Tree { number } => {
            let show_ids = container.settings.show_ids;
            match number {
                Some(number) => {
                    let technology = catalog.technology_by_number(number)?;
                    output::info(&technology.to_tree_string(show_ids));
                }
                None => {
                    for technology in catalog.technologies() {
                        output::info(&technology.to_tree_string(show_ids));
                    }
                }
            }
            Ok(false)
        }
        Commands::Add {
            technology,
            parent,
            operation,
            reference,
        } => {
            let reference_technology = match reference {
                Some(number) => Some(catalog.technology_by_number(number)?.id),
                None => None,
            };
            let component = NewComponent {
                parent: parent.map(EntityId),
                operation: operation.map(EntityId),
                reference_technology,
                ..NewComponent::default()
            };
            let id = service.add_component(catalog, technology, component, now)?;
            output::action("Added component", &format!("#{} to {}", id, technology));
            Ok(true)
        }
        Commands::Update {
            technology,
            id,
            operation,
            process_list,
            clear_process_list,
            assigned,
        } => {
            let operation = operation.map(EntityId);
            let process_list = process_list.map(EntityId);
            let clear_process_list = *clear_process_list;
            let assigned = assigned.map(AssignedToOperation::from);
            service.update_component(
                catalog,
                technology,
                EntityId(*id),
                |data| {
                    if let Some(op) = operation {
                        data.operation = Some(op);
                    }
                    if let Some(list) = process_list {
                        data.attributes
                            .set(Field::TechnologicalProcessList, FieldValue::BelongsTo(list));
                    }
                    if clear_process_list {
                        data.attributes.clear(Field::TechnologicalProcessList);
                    }
                    if let Some(assigned) = assigned {
                        data.attributes.set(Field::AssignedToOperation, assigned);
                    }
                },
                now,
            )?;
            output::action("Updated component", &format!("#{} in {}", id, technology));
            Ok(true)
        }
        Commands::Delete { technology, id } => {
            let removed = service.delete_component(catalog, technology, EntityId(*id))?;
            output::action(
                "Deleted",
                &format!("{} component(s) from {}", removed, technology),
            );
            Ok(true)
        }
        Commands::Use { id, technology } => {
            let main_technology = catalog.technology_by_number(technology)?.id;
            let operation_component = EntityId(*id);
            catalog.component_owner(operation_component)?;
            catalog.add_structure_usage(StructureUsage {
                operation_component,
                main_technology,
            });
            output::action("Recorded usage", &format!("#{} in {}", id, technology));
            Ok(true)
        }
        Commands::CheckCycle {
            technology,
            reference,
        } => {
            match service.check_reference(catalog, technology, reference) {
                Ok(()) => output::success(&format!(
                    "{} may be copied into {}",
                    reference, technology
                )),
                Err(e) => {
                    output::failure(&format!(
                        "{} cannot be copied into {}",
                        reference, technology
                    ));
                    return Err(e.into());
                }
            }
            Ok(false)
        }
        Commands::Config { .. } | Commands::Completion { .. } => Ok(false),
    }
}

fn operation_command(catalog: &mut Catalog, command: &OperationCommands) -> CliResult<bool> {
    match command {
        OperationCommands::Add {
            number,
            name,
            comment,
            product,
            quantity_of_workstations,
            assigned,
            workstation_type,
            workstations,
        } => {
            if catalog.operations().any(|op| &op.number == number) {
                return Err(CliError::InvalidArgs(format!(
                    "operation {} already exists",
                    number
                )));
            }
            let id = catalog.next_id();
            catalog.add_operation(Operation {
                id,
                number: number.clone(),
                name: name.clone(),
                comment: comment.clone(),
                product: product.map(EntityId),
                quantity_of_workstations: *quantity_of_workstations,
                assigned_to_operation: assigned.map(AssignedToOperation::from),
                workstation_type: workstation_type.map(EntityId),
                workstations: workstations.iter().copied().map(EntityId).collect(),
                ..Operation::default()
            });
            output::action("Created operation", &format!("{} (id {})", number, id));
            Ok(true)
        }
        OperationCommands::List => {
            for op in catalog.operations() {
                output::info(&format!("{:>6}  {}  {}", op.id.to_string(), op.number, op.name));
            }
            Ok(false)
        }
    }
}

fn config_command(container: &ServiceContainer, command: &ConfigCommands) -> CliResult<()> {
    match command {
        ConfigCommands::Show => {
            output::info(&container.settings.to_toml()?);
        }
        ConfigCommands::Template => {
            output::info(&Settings::template());
        }
        ConfigCommands::Path => {
            match global_config_path() {
                Some(path) => {
                    let marker = if container.fs.exists(&path) {
                        ""
                    } else {
                        " (not found)"
                    };
                    output::action("Config", &format!("{}{}", path.display(), marker));
                }
                None => output::warning("no config directory available"),
            }
            output::action("Store", &container.settings.store.display());
        }
    }
    Ok(())
}

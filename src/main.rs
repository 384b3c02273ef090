use std::env;
use std::path::Path;
use std::time::Duration;

use anyhow::{anyhow, ensure, Context, Result};
use glam::Vec3;

use anatomica::{
    load_obj_file, FrameInput, GameDefinition, GameSession, Haptic, Mode, NodeId, PanelId, Phase,
    SceneGraph, ShellCommand, Transform,
};

fn main() {
    env_logger::init();
    if let Err(err) = run() {
        eprintln!("Error: {err:?}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let options = CliOptions::parse()?;
    let definition = match &options.definition {
        Some(path) => GameDefinition::from_xml_file(Path::new(path))
            .with_context(|| format!("failed to load definition {path}"))?,
        None => GameDefinition::default(),
    };
    let graph = load_obj_file(Path::new(&options.model))
        .with_context(|| format!("failed to load model {}", options.model))?;
    println!("Loaded model with {} nodes", graph.node_count());

    let mut session = match options.seed {
        Some(seed) => GameSession::with_seed(definition, seed),
        None => GameSession::new(definition),
    };
    session.on_model_loaded(graph);
    session.on_font_loaded();

    println!("Classified {} organ groups:", session.groups().len());
    for group in session.groups() {
        match group.anchor {
            Some(anchor) => println!(
                " - {}: {} node(s), anchor {}",
                group.name,
                group.members.len(),
                format_point(anchor)
            ),
            None => println!(
                " - {}: {} node(s), no geometry",
                group.name,
                group.members.len()
            ),
        }
    }

    if options.play {
        play_round(&mut session, options.mode)?;
    }
    Ok(())
}

/// Replays one full scripted round against the loaded model, acting as a
/// stand-in shell: commands are printed, sound loads complete instantly and
/// every confirm is aimed straight at its target.
fn play_round(session: &mut GameSession, mode: Mode) -> Result<()> {
    let surface = Transform::IDENTITY;
    let mut clock = Duration::ZERO;

    println!("Placing the model:");
    let commands = session.on_frame(FrameInput {
        now: clock,
        controller: Transform::IDENTITY,
        surface: Some(surface),
    });
    pump(session, commands);
    let commands = session.on_confirm(Transform::IDENTITY);
    pump(session, commands);
    ensure!(
        session.phase() == Phase::MenuOpen,
        "placing the model did not open the menu"
    );

    println!("Choosing {mode}:");
    let commands = confirm_at(session, Vec3::new(0.0, 0.2, 0.0));
    pump(session, commands);
    let slot = match mode {
        Mode::Simple => Vec3::new(-0.3, 0.0, 0.0),
        Mode::Advanced => Vec3::new(0.3, 0.0, 0.0),
    };
    let commands = confirm_at(session, slot);
    pump(session, commands);

    loop {
        let Some((label, anchor)) = session
            .current_target()
            .map(|target| (target.label().to_string(), target.anchor()))
        else {
            break;
        };
        clock += Duration::from_secs(1);
        let commands = session.on_frame(FrameInput {
            now: clock,
            controller: Transform::IDENTITY,
            surface: Some(surface),
        });
        pump(session, commands);

        println!("Placing the {label}:");
        let before = session.queue().cursor();
        let commands = confirm_at(session, anchor);
        pump(session, commands);
        ensure!(
            session.queue().cursor() > before,
            "scripted placement of {label:?} did not land"
        );
    }

    ensure!(
        session.phase() == Phase::Victory,
        "round finished without reaching victory"
    );
    println!(
        "Round complete in {}s of play time",
        session.played_seconds()
    );

    println!("After the celebration:");
    clock += session.definition().victory_delay;
    let commands = session.on_frame(FrameInput {
        now: clock,
        controller: Transform::IDENTITY,
        surface: Some(surface),
    });
    pump(session, commands);
    let commands = session.on_session_end();
    pump(session, commands);
    Ok(())
}

/// Confirms with the controller hovering over `target`, aiming down -Z.
fn confirm_at(session: &mut GameSession, target: Vec3) -> Vec<ShellCommand> {
    session.on_confirm(Transform::from_translation(target + Vec3::Z))
}

/// Prints each command and answers load requests on the spot, so deferred
/// playbacks surface in the same pump.
fn pump(session: &mut GameSession, commands: Vec<ShellCommand>) {
    let mut pending = commands;
    while !pending.is_empty() {
        let mut released = Vec::new();
        for command in pending {
            println!("   {}", describe(session.graph(), &command));
            if let ShellCommand::LoadSound { path } = &command {
                released.extend(session.on_sound_loaded(path));
            }
        }
        pending = released;
    }
}

fn describe(graph: Option<&SceneGraph>, command: &ShellCommand) -> String {
    match command {
        ShellCommand::ShowPanel(panel) => format!("show {} panel", panel_name(*panel)),
        ShellCommand::HidePanel(panel) => format!("hide {} panel", panel_name(*panel)),
        ShellCommand::SetPrompt(text) => format!("prompt {text:?}"),
        ShellCommand::ClearPrompt => "clear prompt".to_string(),
        ShellCommand::AnchorModel(transform) => {
            format!("anchor model at {}", format_point(transform.translation))
        }
        ShellCommand::SetNodeVisible { node, visible } => format!(
            "{} {}",
            if *visible { "show" } else { "hide" },
            node_name(graph, *node)
        ),
        ShellCommand::SetNodeHighlight { node, highlighted } => format!(
            "highlight {} {}",
            node_name(graph, *node),
            if *highlighted { "on" } else { "off" }
        ),
        ShellCommand::LoadSound { path } => format!("load sound {path}"),
        ShellCommand::PlaySound { path, position } => {
            format!("play sound {path} at {}", format_point(*position))
        }
        ShellCommand::StartLoop { path, position } => {
            format!("start loop {path} at {}", format_point(*position))
        }
        ShellCommand::StopLoop { path } => format!("stop loop {path}"),
        ShellCommand::Haptic(Haptic::Strong) => "strong haptic pulse".to_string(),
        ShellCommand::Haptic(Haptic::Light) => "light haptic pulse".to_string(),
        ShellCommand::SpawnParticles { position, .. } => {
            format!("particle burst at {}", format_point(*position))
        }
        ShellCommand::SpawnMarker { position, .. } => {
            format!("marker at {}", format_point(*position))
        }
    }
}

fn panel_name(panel: PanelId) -> &'static str {
    match panel {
        PanelId::Menu => "menu",
        PanelId::Rules => "rules",
        PanelId::Difficulty => "difficulty",
    }
}

fn node_name(graph: Option<&SceneGraph>, node: NodeId) -> String {
    graph
        .and_then(|graph| graph.name(node))
        .unwrap_or_else(|| format!("node #{}", node.index()))
}

fn format_point(point: Vec3) -> String {
    format!("({:.2}, {:.2}, {:.2})", point.x, point.y, point.z)
}

struct CliOptions {
    model: String,
    definition: Option<String>,
    mode: Mode,
    seed: Option<u64>,
    play: bool,
}

impl CliOptions {
    fn parse() -> Result<Self> {
        let mut args = env::args().skip(1);
        let Some(model) = args.next() else {
            return Err(anyhow!(
                "Usage: anatomica <model.obj> [--definition <game.xml>] [--mode simple|advanced] [--seed <n>] [--play]"
            ));
        };
        let mut definition = None;
        let mut mode = Mode::Simple;
        let mut seed = None;
        let mut play = false;
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--definition" => {
                    definition = Some(
                        args.next()
                            .ok_or_else(|| anyhow!("--definition needs a file path"))?,
                    );
                }
                "--mode" => {
                    let value = args
                        .next()
                        .ok_or_else(|| anyhow!("--mode needs simple or advanced"))?;
                    mode = match value.as_str() {
                        "simple" => Mode::Simple,
                        "advanced" => Mode::Advanced,
                        other => {
                            return Err(anyhow!(
                                "Unknown mode: {other}. Expected simple or advanced"
                            ));
                        }
                    };
                }
                "--seed" => {
                    let value = args.next().ok_or_else(|| anyhow!("--seed needs a number"))?;
                    seed = Some(
                        value
                            .parse()
                            .with_context(|| format!("invalid seed {value:?}"))?,
                    );
                }
                "--play" => play = true,
                other => {
                    return Err(anyhow!("Unknown argument: {other}"));
                }
            }
        }
        Ok(Self {
            model,
            definition,
            mode,
            seed,
            play,
        })
    }
}

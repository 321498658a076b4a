//! Logging functionality and error reporting.
//! The logging library of choice is [tracing].

use itertools::Itertools;
use poise::BoxFuture;
use poise::CreateReply;
use poise::FrameworkError;
use serenity::CreateMessage;
use tracing::debug;
use tracing::error;
use tracing::level_filters::LevelFilter;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    filter::Targets, fmt, layer::SubscriberExt, util::SubscriberInitExt, Layer,
};

use crate::error::UserError;
use crate::serenity;
use crate::Config;
use crate::Context;
use crate::Data;
use crate::BotError;

/// The name of this crate, used to set filter target.
const THIS_CRATE: &str = env!("CARGO_CRATE_NAME");

/// Setup format layers, tracing subscribers, and installs tracing.
pub(super) fn install_tracing(config: &Config) -> Option<WorkerGuard> {
    // Uses local time.
    let timer = fmt::time::ChronoLocal::rfc_3339();

    // Set which traces are tracked.
    // By default, all INFO traces and above are shown.
    let target = if config.console_debug() {
        Targets::new()
            .with_default(LevelFilter::INFO)
            .with_target(THIS_CRATE, LevelFilter::DEBUG)
    } else {
        Targets::new().with_default(LevelFilter::INFO)
    };

    // Compose the layer that prints traces to stdout
    let console_layer = if config.console_debug() {
        // Debug layer
        fmt::layer()
            .with_ansi(true)
            .with_file(true)
            .with_level(true)
            .with_line_number(true)
            .with_target(true)
            .with_timer(timer.clone())
            .pretty()
            .with_filter(target.clone())
    } else {
        // Default layer
        fmt::layer()
            .with_ansi(true)
            .with_file(false)
            .with_level(true)
            .with_line_number(false)
            .with_target(true)
            .with_timer(timer.clone())
            .pretty()
            .with_filter(target.clone())
    };

    // Compose the layer that writes logs and get a guard for the writer.
    // Output is similar to console logs with a few changes (see below).
    let (log_layer, guard) = if config.logs_enabled() {
        // Get the directory to store logs.
        let dir = config.log_dir();

        // Put file logs in `log_dir` directory as "{THIS_CRATE}.log.{TIMESTAMP}" on an hourly basis.
        let prefix_format = format!("{THIS_CRATE}.log");
        let appender = tracing_appender::rolling::hourly(dir, prefix_format);

        // Create the writer and writer guard.
        let (writer, guard) = tracing_appender::non_blocking(appender);

        // Construct the layer.
        let layer = if config.console_debug() {
            // Debug layer
            fmt::layer()
                .with_ansi(false)
                .with_file(true)
                .with_level(true)
                .with_line_number(true)
                .with_target(true)
                .with_timer(timer)
                .with_writer(writer)
                .compact()
                .with_filter(target)
        } else {
            // Default layer
            fmt::layer()
                .with_ansi(false)
                .with_file(false)
                .with_level(true)
                .with_line_number(false)
                .with_target(true)
                .with_timer(timer)
                .with_writer(writer)
                .compact()
                .with_filter(target)
        };

        (Some(layer), Some(guard))
    } else {
        (None, None)
    };

    // Add all the layers and initialize them.
    tracing_subscriber::registry()
        .with(console_layer)
        .with(log_layer)
        .init();

    guard
}

/// How a [FrameworkError] is answered.
enum Reaction<'a> {
    /// Expected misuse. The user gets a short explanation.
    Misuse {
        ctx: Context<'a>,
        error: BotError,
        add_info: Option<String>,
    },
    /// Something that shouldn't happen. Logged as error and reported.
    Bug {
        ctx: Context<'a>,
        error: BotError,
        reply: &'static str,
    },
}

/// Defines various behaviors for how to handle errors.
/// Triggers an [ephemeral_reply] on [BotError::UserError].
/// Triggers a [notify_bug] on unexpected errors.
pub fn handle_framework_error(err: FrameworkError<Data, BotError>) -> BoxFuture<()> {
    Box::pin(async move {
        let response = match react(err) {
            Some(Reaction::Misuse {
                ctx,
                error,
                add_info,
            }) => Response::builder()
                .ctx(ctx)
                .reply(error.to_string())
                .source(error)
                .maybe_add_info(add_info)
                .build(),
            Some(Reaction::Bug { ctx, error, reply }) => Response::builder()
                .ctx(ctx)
                .reply(reply)
                .source(error)
                .notify(true)
                .is_error(true)
                .build(),
            None => return,
        };
        response.send().await;
    })
}

/// Sort a [FrameworkError] into a [Reaction].
/// Errors nobody should be answered for are logged here and give `None`.
fn react(err: FrameworkError<'_, Data, BotError>) -> Option<Reaction<'_>> {
    let misuse = |ctx, error: UserError| Reaction::Misuse {
        ctx,
        error: error.into(),
        add_info: None,
    };

    let reaction = match err {
        // ---
        // Invisible to users.
        // ---
        FrameworkError::Setup { error, .. } => {
            error!("Error during startup: {error}");
            return None;
        }
        FrameworkError::EventHandler { error, event, .. } => {
            error!("Error while handling event. Event: {event:#?} Error:{error}");
            return None;
        }

        // ---
        // Seen by users but not logged as error!
        // e.g. using `/skip` when nothing is playing is expected behavior.
        // ---
        FrameworkError::Command {
            error: error @ BotError::UserError(_),
            ctx,
            ..
        } => Reaction::Misuse {
            ctx,
            error,
            add_info: None,
        },
        FrameworkError::SubcommandRequired { ctx } => {
            let subcmds = ctx
                .command()
                .subcommands
                .iter()
                .map(|s| s.name.as_str())
                .join(", ");
            misuse(ctx, UserError::MissingSubcommand { subcmds })
        }
        FrameworkError::ArgumentParse {
            error, input, ctx, ..
        } => Reaction::Misuse {
            ctx,
            error: UserError::BadArgs { input }.into(),
            add_info: Some(error.to_string()),
        },
        FrameworkError::CooldownHit {
            remaining_cooldown,
            ctx,
            ..
        } => misuse(ctx, UserError::OnCooldown { remaining_cooldown }),
        FrameworkError::MissingBotPermissions {
            missing_permissions,
            ctx,
            ..
        } => misuse(
            ctx,
            UserError::MissingBotPermissions {
                missing_permissions,
            },
        ),
        FrameworkError::MissingUserPermissions {
            missing_permissions,
            ctx,
            ..
        } => misuse(
            ctx,
            UserError::MissingUserPermissions {
                missing_permissions,
            },
        ),
        FrameworkError::NotAnOwner { ctx, .. } => misuse(ctx, UserError::NotOwner),
        FrameworkError::GuildOnly { ctx, .. } => misuse(ctx, UserError::GuildOnly),
        FrameworkError::DmOnly { ctx, .. } => misuse(ctx, UserError::DmOnly),
        FrameworkError::NsfwOnly { ctx, .. } => misuse(ctx, UserError::NsfwOnly),
        FrameworkError::CommandCheckFailed { error, ctx, .. } => Reaction::Misuse {
            ctx,
            error: BotError::CheckFailed {
                reason: error.map(|e| e.to_string()),
            },
            add_info: None,
        },

        // ---
        // Seen by users and logged as error!, these should be fixed.
        // ---
        FrameworkError::Command { error, ctx, .. } => Reaction::Bug {
            ctx,
            error,
            reply: "Something went wrong... A bug report has been sent.",
        },
        FrameworkError::CommandPanic { payload, ctx, .. } => Reaction::Bug {
            ctx,
            error: BotError::Panic { payload },
            reply: "Something went horribly wrong... A bug report has been sent.",
        },
        FrameworkError::CommandStructureMismatch {
            description, ctx, ..
        } => Reaction::Bug {
            ctx: ctx.into(),
            error: BotError::CommandStructureMismatch {
                description: description.to_string(),
            },
            reply: "Command structure mismatch. Please wait until discord catches up to a bot update.",
        },

        // ---
        // Unreachable, only slash commands are registered.
        // ---
        FrameworkError::UnknownCommand { .. } => {
            error!("Prefix commands are not supported.");
            return None;
        }
        FrameworkError::UnknownInteraction { interaction, .. } => {
            error!("Received unknown interaction: {}", interaction.data.name);
            return None;
        }
        FrameworkError::DynamicPrefix { .. } => {
            error!("Dynamic prefixes are not supported.");
            return None;
        }
        _ => {
            error!("Unhandled framework error.");
            return None;
        }
    };

    Some(reaction)
}

/// Sends an ephemeral reply to the [Context] author.
async fn ephemeral_reply(ctx: &Context<'_>, content: impl Into<String>) {
    let reply = CreateReply::default().ephemeral(true).content(content);
    if let Err(e) = ctx.send(reply).await {
        error!("Failed to send ephemeral reply. {e}")
    };
}

/// Sends a notification (via private message) to users in [notify_list](Data::notify_list).
/// If message fails, only log and don't retry.
async fn notify_bug(ctx: &Context<'_>, content: impl Into<String>) {
    let message = CreateMessage::new().content(content);

    let notify_list = &ctx.data().notify_list;
    for user in notify_list {
        if let Err(e) = user.direct_message(ctx, message.clone()).await {
            error!("Failed to send bug notification. {e}");
        }
    }
}

/// Helper function to create debug information from [Context]
fn debug_info(ctx: &Context) -> String {
    let user = &ctx.author().name;
    let cmd = &ctx.command().name;
    let user_input = ctx.invocation_string();
    format!("{user} tried to use {cmd} with {user_input}.")
}

/// Structured response to errors.
/// Always logs as at least [debug level](tracing::debug), but is upgraded to
/// [error level](tracing::error) if `is_error` is set.
/// Additionally, notify messages are accompanied by [debug info](debug_info).
#[derive(bon::Builder)]
#[builder(on(String, into))]
struct Response<'a> {
    /// The context of the response
    ctx: Context<'a>,
    /// The reason for this reply, usually the error causing the response.
    #[builder(into)]
    source: BotError,
    /// Optional ephemeral reply to user.
    reply: Option<String>,
    /// Additional information to log
    add_info: Option<String>,
    /// Set to `true` to log as error.
    #[builder(default = false)]
    is_error: bool,
    /// Set to `true` to send notifications of the error.
    /// Does nothing if `is_error` is false.
    #[builder(default = false)]
    notify: bool,
}

impl Response<'_> {
    /// Execute the response
    async fn send(&self) {
        let ctx = &self.ctx;

        let log_message = {
            let source = &self.source;
            let add_info = self
                .add_info
                .as_ref()
                // Map `None` to "" otherwise format it to be appended to another string.
                .map_or("".to_string(), |s| format!("| {s}"));
            format!("{source} {add_info}")
        };
        if self.is_error {
            error!("{log_message}");
            if self.notify {
                // Construct and send notification message

                let dbg_info = debug_info(ctx);
                // Format of message
                let content = format!("Debug Info: {dbg_info}\n{log_message}");
                notify_bug(ctx, content).await;
            }
        } else {
            debug!("{log_message}");
        }

        // Send ephemeral reply if there is one.
        if let Some(ref reply) = self.reply {
            ephemeral_reply(ctx, reply).await;
        }
    }
}

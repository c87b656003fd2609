// src/config/validate.rs

use crate::config::model::{RawCommand, RawRoutine, RawRoutinesFile, RoutinesFile};
use crate::errors::{Result, RoutineError};
use crate::hooks::{FinalizeRef, HookRef, InitializeRef};
use crate::routine::{Command, CommandKind, RegistryBuilder, Routine};

impl TryFrom<RawRoutinesFile> for RoutinesFile {
    type Error = RoutineError;

    fn try_from(raw: RawRoutinesFile) -> std::result::Result<Self, Self::Error> {
        let mut builder = RegistryBuilder::new();
        for (name, routine) in raw.routine {
            builder.routine(build_routine(&name, routine)?);
        }
        Ok(RoutinesFile {
            config: raw.config,
            registry: builder.build(),
        })
    }
}

fn build_routine(name: &str, raw: RawRoutine) -> Result<Routine> {
    if name.trim_start_matches('-').is_empty() {
        return Err(RoutineError::ImproperlyConfigured(
            "routine names must not be empty".to_string(),
        ));
    }

    let mut routine = Routine::new(name, raw.help_text);
    routine.subprocess = raw.subprocess;
    routine.atomic = raw.atomic;
    routine.continue_on_error = raw.continue_on_error;
    routine.initialize = raw.initialize.map(InitializeRef::named);
    routine.finalize = raw.finalize.map(FinalizeRef::named);
    routine.pre_hook = raw.pre_hook.map(HookRef::named);
    routine.post_hook = raw.post_hook.map(HookRef::named);
    for (switch, help) in raw.switch_helps {
        routine = routine.with_switch_help(&switch, help);
    }

    for (position, command) in raw.commands.into_iter().enumerate() {
        let command = build_command(command).map_err(|err| match err {
            RoutineError::ImproperlyConfigured(msg) => RoutineError::ImproperlyConfigured(format!(
                "routine '{name}', command #{}: {msg}",
                position + 1
            )),
            other => other,
        })?;
        routine.add(command);
    }
    Ok(routine)
}

fn build_command(raw: RawCommand) -> Result<Command> {
    let RawCommand {
        management,
        command,
        system,
        priority,
        switches,
        options,
        pre_hook,
        post_hook,
    } = raw;

    let mut built = match (management.or(command), system) {
        (Some(invocation), None) => Command::management(invocation.into_tokens())?,
        (None, Some(invocation)) => Command::system(invocation.into_tokens())?,
        (Some(_), Some(_)) => {
            return Err(RoutineError::ImproperlyConfigured(
                "a command must set exactly one of `management` or `system`".to_string(),
            ));
        }
        (None, None) => {
            return Err(RoutineError::ImproperlyConfigured(
                "a command must set `management` or `system`".to_string(),
            ));
        }
    };

    if let Some(options) = options {
        if !built.is_management() {
            return Err(RoutineError::ImproperlyConfigured(format!(
                "`options` are not valid for system command `{built}`"
            )));
        }
        if let CommandKind::Management { options: slot } = &mut built.kind {
            *slot = options;
        }
    }

    built = built.with_priority(priority).with_switches(switches);
    if let Some(hook) = pre_hook {
        built = built.with_pre_hook(HookRef::named(hook));
    }
    if let Some(hook) = post_hook {
        built = built.with_post_hook(HookRef::named(hook));
    }
    Ok(built)
}

#[cfg(test)]
mod tests {
    use crate::config::parse_str;
    use crate::errors::RoutineError;
    use crate::hooks::HookRef;

    fn improperly_configured(toml: &str) -> String {
        match parse_str(toml) {
            Err(RoutineError::ImproperlyConfigured(msg)) => msg,
            other => panic!("expected ImproperlyConfigured, got {other:?}"),
        }
    }

    #[test]
    fn commands_are_built_in_priority_order() {
        let file = parse_str(
            r#"
            [config]
            manage_script = "./manage"

            [routine.test]
            help_text = "Test Routine 1"
            pre_hook = "log"
            switch_helps = { demo = "Demo switch" }

            [[routine.test.commands]]
            management = ["track", "1"]
            priority = 4

            [[routine.test.commands]]
            command = "track 2"
            switches = ["demo"]
            options = { demo = 6 }

            [[routine.test.commands]]
            system = ["ls", "-l"]
            priority = 1
            post_hook = "stop"
            "#,
        )
        .unwrap();

        assert_eq!(file.config.manage_script.as_deref(), Some("./manage"));
        let routine = file.registry.get("test").unwrap();
        let listing: Vec<String> = routine.commands().iter().map(|c| c.listing()).collect();
        assert_eq!(listing, ["[0] track 2 (demo=6) | demo", "[1] ls -l", "[4] track 1"]);
        assert_eq!(routine.pre_hook, Some(HookRef::named("log")));
        assert_eq!(routine.commands()[1].post_hook, Some(HookRef::named("stop")));
        assert_eq!(routine.switch_help("demo"), "Demo switch");
    }

    #[test]
    fn exactly_one_invocation_kind() {
        let msg = improperly_configured(
            r#"
            [[routine.r.commands]]
            management = "a"
            system = "b"
            "#,
        );
        assert!(msg.contains("exactly one"));

        let msg = improperly_configured(
            r#"
            [[routine.r.commands]]
            priority = 1
            "#,
        );
        assert!(msg.contains("routine 'r', command #1"));
    }

    #[test]
    fn system_commands_reject_options() {
        let msg = improperly_configured(
            r#"
            [[routine.r.commands]]
            system = ["ls"]
            options = { a = 1 }
            "#,
        );
        assert!(msg.contains("not valid for system command"));
    }

    #[test]
    fn empty_invocations_and_unknown_keys_are_rejected() {
        improperly_configured(
            r#"
            [[routine.r.commands]]
            management = []
            "#,
        );
        improperly_configured(
            r#"
            [routine.r]
            colour = "blue"
            "#,
        );
    }
}

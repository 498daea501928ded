// ─── Link-time handler registration ──────────────────────────────────────────
//
// Each macro appends one `StaticSource` to a distributed slice in
// `crate::loader`. The module path of the invocation site becomes the source
// name, so a module named `_draft` is skipped by the loader.

/// Registers a message command constructor.
///
/// ```rust,ignore
/// fn ping() -> anyhow::Result<CommandDescriptor> {
///     Ok(CommandDescriptor::new("ping", run).cooldown(5.0))
/// }
///
/// brass::command!(PING, "Test" => ping);
/// ```
#[macro_export]
macro_rules! command {
    ($name:ident, $category:literal => $build:path) => {
        #[$crate::linkme::distributed_slice($crate::loader::COMMAND_SOURCES)]
        #[linkme(crate = $crate::linkme)]
        static $name: $crate::loader::StaticSource<$crate::descriptor::CommandDescriptor> =
            $crate::loader::StaticSource {
                category: $category,
                module: ::std::module_path!(),
                build: $build,
            };
    };
}

/// Registers a slash command constructor.
#[macro_export]
macro_rules! slash_command {
    ($name:ident, $category:literal => $build:path) => {
        #[$crate::linkme::distributed_slice($crate::loader::SLASH_COMMAND_SOURCES)]
        #[linkme(crate = $crate::linkme)]
        static $name: $crate::loader::StaticSource<
            $crate::descriptor::SlashCommandDescriptor,
        > = $crate::loader::StaticSource {
            category: $category,
            module: ::std::module_path!(),
            build: $build,
        };
    };
}

/// Registers an event handler constructor. The category is informational.
#[macro_export]
macro_rules! event {
    ($name:ident, $category:literal => $build:path) => {
        #[$crate::linkme::distributed_slice($crate::loader::EVENT_SOURCES)]
        #[linkme(crate = $crate::linkme)]
        static $name: $crate::loader::StaticSource<$crate::descriptor::EventDescriptor> =
            $crate::loader::StaticSource {
                category: $category,
                module: ::std::module_path!(),
                build: $build,
            };
    };
}

use itertools::Itertools;
use tracing::info;

use crate::compiler::{compile_block, Block, CompiledBlock};
use crate::error::Result;
use crate::program::Program;
use crate::schema::Schema;

/// Generates the C++ header implementing `program`.
///
/// Fails on the first invalid collection, preload or rule; nothing is
/// returned for a program that does not translate completely.
pub fn generate(program: &Program) -> Result<String> {
    let args = program.arguments()?;
    let schema = program.build_schema()?;
    let tuples = program.build_tuples(&schema)?;

    let bootstrap = compile_block(
        &schema,
        &tuples,
        Block::Bootstrap,
        program
            .bootstrap
            .iter()
            .map(|(name, code)| (name.as_str(), code.as_str())),
    )?;
    let bloom = compile_block(
        &schema,
        &tuples,
        Block::SteadyState,
        program
            .bloom
            .iter()
            .map(|(name, code)| (name.as_str(), code.as_str())),
    )?;

    let mut s = prologue(&program.name, &args);

    s.push_str("\n    ///////////////\n");
    s.push_str("    // Bloom Schema\n");
    for entry in schema.entries() {
        s.push_str("    .");
        s.push_str(&entry.declaration());
        s.push('\n');
    }
    s.push_str("    ///////////////\n");
    s.push_str("  ;\n");

    for set in tuples.iter() {
        s.push_str(&set.declaration());
    }

    if let Some(preamble) = &program.preamble {
        s.push_str("\n  // Explicit C++ preamble code\n");
        s.push_str(preamble);
        s.push('\n');
    }

    let mut last = "schema";
    if !bootstrap.is_empty() {
        s.push_str("  auto bootstrap = std::move(schema)\n");
        s.push_str(&block_registration(&schema, &bootstrap));
        s.push_str(";\n");
        last = "bootstrap";
    }

    s.push_str(&format!("  auto bloom = std::move({})\n", last));
    s.push_str(&block_registration(&schema, &bloom));

    s.push_str(&epilogue(&program.name));

    info!(
        program = %program.name,
        bootstrap_rules = bootstrap.statements.len(),
        rules = bloom.statements.len(),
        "generated program"
    );
    Ok(s)
}

/// The `.Register*Rules(...)` call for one block, including its lambda.
pub fn block_registration(schema: &Schema, block: &CompiledBlock) -> String {
    let mut s = String::new();

    s.push_str(&format!(
        "    .{}([&]({}) {{\n",
        block.block.register_method(),
        schema.names().map(|name| format!("auto& {}", name)).join(", ")
    ));
    for name in schema.names() {
        s.push_str(&format!("      (void){};\n", name));
    }
    s.push_str("      using namespace fluent::infix;\n");

    let rule = "/".repeat(block.block.title().len() + 3);
    s.push_str(&format!("\n      {}\n", rule));
    s.push_str(&format!("      // {}\n", block.block.title()));
    for statement in &block.statements {
        s.push_str("      ");
        s.push_str(statement);
        s.push('\n');
    }
    s.push_str(&format!("      return {};\n", block.closing));
    s.push_str(&format!("      {}\n", rule));
    s.push_str("    })\n");

    s
}

fn header_guard(name: &str) -> String {
    format!("{}_H_", name.to_uppercase())
}

fn prologue(name: &str, args: &[(&str, &str)]) -> String {
    let guard = header_guard(name);
    let mut s = String::new();

    s.push_str(&format!("#ifndef {}\n#define {}\n", guard, guard));
    s.push_str(
        r#"
#include <vector>

#include "zmq.hpp"

#include "common/status.h"
#include "fluent/fluent_builder.h"
#include "fluent/fluent_executor.h"
#include "fluent/infix.h"
#include "lineagedb/connection_config.h"
#include "lineagedb/noop_client.h"
#include "lineagedb/to_sql.h"
#include "ra/logical/all.h"
#include "common/hash_util.h"

namespace lra = fluent::ra::logical;

"#,
    );

    s.push_str(&format!("struct {}Args {{\n", name));
    for (arg, ty) in args {
        s.push_str(&format!("  {} {};\n", ty, arg));
    }
    s.push_str("};\n\n");

    s.push_str(&format!("int {}Main(const {}Args& args) {{\n", name, name));
    s.push_str(
        r#"  zmq::context_t context(1);
  fluent::lineagedb::ConnectionConfig connection_config;
  auto fb = fluent::fluent<fluent::lineagedb::NoopClient,fluent::Hash,
                           fluent::lineagedb::ToSql,fluent::MockPickler,
                           std::chrono::system_clock>
"#,
    );
    s.push_str(&format!(
        "                           (\"{}_\" + std::to_string(rand()),\n",
        name
    ));
    s.push_str(
        r#"                                    args.address, &context,
                                    connection_config)
    .ConsumeValueOrDie();
  auto schema = std::move(fb)
"#,
    );

    s
}

fn epilogue(name: &str) -> String {
    format!(
        r#"
  .ConsumeValueOrDie();
    fluent::Status status = std::move(bloom).Run();
    CHECK_EQ(fluent::Status::OK, status);

    return 0;
}}

#endif  // {}
"#,
        header_guard(name)
    )
}

// g2p-compile: Compile an ARPA graphone n-gram model into a transducer.
//
// Usage:
//   g2p-compile [-c CONFIG] MODEL.arpa OUTPUT
//
// Options:
//   -c, --config PATH   TOML configuration (default: built-in)
//   -h, --help          Print help

use g2p_fst::{ArpaModel, LmCompiler, NgramModel};

fn main() {
    let args: Vec<String> = std::env::args().skip(1).collect();

    if g2p_cli::wants_help(&args) {
        println!("g2p-compile: Compile an ARPA graphone model into a transducer.");
        println!();
        println!("Usage: g2p-compile [-c CONFIG] MODEL.arpa OUTPUT");
        println!();
        println!("MODEL.arpa tokens are graphones such as `P|H}}F` or `E}}<eps>`.");
        println!();
        println!("Options:");
        println!("  -c, --config PATH  TOML configuration (default: built-in)");
        println!("  -h, --help         Print this help");
        return;
    }

    g2p_cli::init_logging();
    let (config_path, args) = g2p_cli::parse_option(&args, "--config", "-c");
    let [model_path, output_path] = args.as_slice() else {
        g2p_cli::fatal("expected MODEL.arpa and OUTPUT arguments (see --help)");
    };

    let config = g2p_cli::load_config(config_path.as_deref()).unwrap_or_else(|e| g2p_cli::fatal(&e));
    let model = ArpaModel::read(model_path)
        .unwrap_or_else(|e| g2p_cli::fatal(&format!("{model_path}: {e}")));
    let transducer = LmCompiler::new(config.decoder)
        .compile(&model)
        .unwrap_or_else(|e| g2p_cli::fatal(&e.to_string()));
    transducer
        .write(output_path)
        .unwrap_or_else(|e| g2p_cli::fatal(&format!("{output_path}: {e}")));

    eprintln!(
        "compiled order-{} model: {} input symbols, {} output symbols -> {output_path}",
        model.order(),
        transducer.input_symbols().len(),
        transducer.output_symbols().len(),
    );
}

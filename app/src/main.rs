/*++

Licensed under the Apache-2.0 license.

File Name:

    main.rs

Abstract:

    File contains main entrypoint for the Montgomery multiplier emulator.

--*/

use clap::{arg, value_parser, ArgAction};
use ecmm_emu_bus::{Bus, Clock};
use ecmm_emu_crypto::{from_limbs, to_limbs, MontCtx};
use ecmm_emu_periph::mm::{MmConfig, PAGE_WORDS};
use ecmm_emu_periph::{MmRootBus, MONT_MUL_BASE};
use ecmm_emu_types::{EmuAddr, EmuSize};
use num_bigint::BigUint;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::process::exit;

// Register offsets within the multiplier window.
const CONTROL: EmuAddr = 0x10;
const STATUS: EmuAddr = 0x14;
const CYCLES_LO: EmuAddr = 0x20;
const CYCLES_HI: EmuAddr = 0x24;
const X_WINDOW: EmuAddr = 0x100;
const Y_WINDOW: EmuAddr = 0x200;
const P_WINDOW: EmuAddr = 0x300;
const PPRIME_WINDOW: EmuAddr = 0x400;
const RESULT_WINDOW: EmuAddr = 0x500;

const CONTROL_GO: u32 = 1;
const STATUS_VALID: u32 = 1 << 1;

fn reg_read(bus: &mut MmRootBus, offset: EmuAddr) -> u32 {
    match bus.read(EmuSize::Word, MONT_MUL_BASE + offset) {
        Ok(val) => val,
        Err(err) => {
            eprintln!("register read at {:#x} failed: {:?}", offset, err);
            exit(1);
        }
    }
}

fn reg_write(bus: &mut MmRootBus, offset: EmuAddr, val: u32) {
    if let Err(err) = bus.write(EmuSize::Word, MONT_MUL_BASE + offset, val) {
        eprintln!("register write at {:#x} failed: {:?}", offset, err);
        exit(1);
    }
}

fn write_operand(bus: &mut MmRootBus, window: EmuAddr, value: &BigUint, ww: u32) {
    for (limb, value) in to_limbs(value, ww, PAGE_WORDS).into_iter().enumerate() {
        reg_write(bus, window + 4 * limb as EmuAddr, value);
    }
}

fn read_result(bus: &mut MmRootBus, ww: u32) -> BigUint {
    let limbs: Vec<u32> = (0..PAGE_WORDS)
        .map(|limb| reg_read(bus, RESULT_WINDOW + 4 * limb as EmuAddr))
        .collect();
    from_limbs(&limbs, ww)
}

/// Programs the operand pages, pulses GO and steps the clock until the
/// result is valid. Returns the result and the cycle count read back from
/// the CYCLES registers.
fn run_multiply(
    clock: &Clock,
    bus: &mut MmRootBus,
    ww: u32,
    x: &BigUint,
    y: &BigUint,
    ctx: &MontCtx,
) -> (BigUint, u64) {
    write_operand(bus, X_WINDOW, x, ww);
    write_operand(bus, Y_WINDOW, y, ww);
    write_operand(bus, P_WINDOW, ctx.p(), ww);
    write_operand(bus, PPRIME_WINDOW, ctx.p_prime(), ww);

    reg_write(bus, CONTROL, CONTROL_GO);
    let mut guard: u64 = 0;
    while reg_read(bus, STATUS) & STATUS_VALID == 0 {
        clock.increment_and_process_timer_actions(1, bus);
        guard += 1;
        if guard > 100_000_000 {
            eprintln!("multiplier never signalled done");
            exit(1);
        }
    }

    let cycles =
        u64::from(reg_read(bus, CYCLES_LO)) | u64::from(reg_read(bus, CYCLES_HI)) << 32;
    (read_result(bus, ww), cycles)
}

fn parse_hex(name: &str, text: &str) -> BigUint {
    let digits = text.trim_start_matches("0x").trim_start_matches("0X");
    match BigUint::parse_bytes(digits.as_bytes(), 16) {
        Some(value) => value,
        None => {
            eprintln!("--{} expects a hex value, got {:?}", name, text);
            exit(1);
        }
    }
}

/// Uniform value below `bound`, built from whole random words.
fn random_below(rng: &mut StdRng, bound: &BigUint) -> BigUint {
    let bits = bound.bits();
    let words = ((bits + 31) / 32) as usize;
    let extra = words as u64 * 32 - bits;
    loop {
        let mut raw: Vec<u32> = (0..words).map(|_| rng.gen()).collect();
        if extra > 0 {
            if let Some(last) = raw.last_mut() {
                *last &= u32::MAX >> extra;
            }
        }
        let value = BigUint::from_slice(&raw);
        if &value < bound {
            return value;
        }
    }
}

/// Random odd modulus of exactly `nn` bits.
fn random_modulus(rng: &mut StdRng, nn: u32) -> BigUint {
    let mut p = random_below(rng, &(BigUint::from(1u32) << nn));
    p.set_bit(u64::from(nn) - 1, true);
    p.set_bit(0, true);
    p
}

/// Smallest accumulation chain that fits `ndsp` units of `ww`-bit limbs.
fn chain_bits(ww: u32, ndsp: usize) -> u32 {
    let mut log2 = 0;
    while (1usize << log2) < ndsp {
        log2 += 1;
    }
    2 * ww + log2 + 1
}

fn main() {
    env_logger::init();

    let args = clap::Command::new("ecmm-emu")
        .about("ECC Montgomery multiplier emulator")
        .arg(
            arg!(--nn <VALUE> "Modulus width in bits")
                .required(false)
                .value_parser(value_parser!(u32))
                .default_value("256"),
        )
        .arg(
            arg!(--ww <VALUE> "Limb width in bits")
                .required(false)
                .value_parser(value_parser!(u32))
                .default_value("16"),
        )
        .arg(
            arg!(--ndsp <VALUE> "Number of multiply-accumulate units")
                .required(false)
                .value_parser(value_parser!(usize))
                .default_value("4"),
        )
        .arg(
            arg!(--sramlat <VALUE> "Memory read latency in cycles")
                .required(false)
                .value_parser(value_parser!(u32))
                .default_value("2"),
        )
        .arg(
            arg!(--"split-clock" "Model separate operand and result clock domains")
                .required(false)
                .action(ArgAction::SetTrue),
        )
        .arg(
            arg!(--x <HEX> "Operand X (requires --y and --p)")
                .required(false)
                .requires("y")
                .requires("p"),
        )
        .arg(
            arg!(--y <HEX> "Operand Y")
                .required(false)
                .requires("x")
                .requires("p"),
        )
        .arg(
            arg!(--p <HEX> "Odd modulus P; P' is derived")
                .required(false)
                .requires("x")
                .requires("y"),
        )
        .arg(
            arg!(--random "Multiply random operands instead of --x/--y/--p")
                .required(false)
                .action(ArgAction::SetTrue)
                .conflicts_with_all(&["x", "y", "p"]),
        )
        .arg(
            arg!(--seed <VALUE> "Seed for the random operand generator")
                .required(false)
                .value_parser(value_parser!(u64)),
        )
        .arg(
            arg!(--trials <VALUE> "Number of random multiplications")
                .required(false)
                .value_parser(value_parser!(u64))
                .default_value("25"),
        )
        .arg(
            arg!(--check "Verify results against the software reference")
                .required(false)
                .action(ArgAction::SetTrue),
        )
        .arg(
            arg!(--quiet "Only report failures")
                .required(false)
                .action(ArgAction::SetTrue),
        )
        .get_matches();

    let nn = *args.get_one::<u32>("nn").unwrap();
    let ww = *args.get_one::<u32>("ww").unwrap();
    let ndsp = *args.get_one::<usize>("ndsp").unwrap();
    let sramlat = *args.get_one::<u32>("sramlat").unwrap();
    let split_rams = args.get_flag("split-clock");
    let trials = *args.get_one::<u64>("trials").unwrap();
    let seed = args.get_one::<u64>("seed").copied();
    let check = args.get_flag("check");
    let quiet = args.get_flag("quiet");

    let cfg = MmConfig {
        nn,
        ww,
        ndsp,
        sramlat,
        split_rams,
        nn_dynamic: false,
        macc_chain_bits: chain_bits(ww, ndsp),
    };
    let clock = Clock::new();
    let mut bus = match MmRootBus::new(&clock, cfg) {
        Ok(bus) => bus,
        Err(err) => {
            eprintln!("invalid configuration: {}", err);
            exit(1);
        }
    };

    let operands = (
        args.get_one::<String>("x"),
        args.get_one::<String>("y"),
        args.get_one::<String>("p"),
    );
    if let (Some(x_hex), Some(y_hex), Some(p_hex)) = operands {
        let p = parse_hex("p", p_hex);
        let x = parse_hex("x", x_hex);
        let y = parse_hex("y", y_hex);
        let ctx = match MontCtx::new(&p, nn + 2) {
            Ok(ctx) => ctx,
            Err(err) => {
                eprintln!("unusable modulus: {:?}", err);
                exit(1);
            }
        };
        let bound = &p + &p;
        if x >= bound || y >= bound {
            eprintln!("operands must be below 2*p");
            exit(1);
        }

        let (result, cycles) = run_multiply(&clock, &mut bus, ww, &x, &y, &ctx);
        if !quiet {
            println!("result = {:x}", result);
            println!("cycles = {}", cycles);
        }
        if check {
            let expect = ctx.redc(&(&x * &y));
            if result != expect {
                eprintln!("mismatch: expected {:x}", expect);
                exit(1);
            }
        }
    } else if args.get_flag("random") {
        let mut rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        for trial in 0..trials {
            let p = random_modulus(&mut rng, nn);
            let ctx = match MontCtx::new(&p, nn + 2) {
                Ok(ctx) => ctx,
                Err(err) => {
                    eprintln!("reference context rejected modulus: {:?}", err);
                    exit(1);
                }
            };
            let x = random_below(&mut rng, &(&p + &p));
            let y = random_below(&mut rng, &(&p + &p));

            let (result, cycles) = run_multiply(&clock, &mut bus, ww, &x, &y, &ctx);
            if check && result != ctx.redc(&(&x * &y)) {
                eprintln!("trial {}: mismatch", trial);
                eprintln!("  x      = {:x}", x);
                eprintln!("  y      = {:x}", y);
                eprintln!("  p      = {:x}", p);
                eprintln!("  got    = {:x}", result);
                eprintln!("  expect = {:x}", ctx.redc(&(&x * &y)));
                exit(1);
            }
            if !quiet {
                println!("trial {:3}: cycles={} result={:x}", trial, cycles, result);
            }
        }
        if !quiet {
            println!("{} trials done", trials);
        }
    } else {
        eprintln!("nothing to do: pass --x/--y/--p or --random");
        exit(1);
    }
}

#[macro_use]
extern crate clap;
#[macro_use]
extern crate failure;
#[macro_use]
extern crate log;

extern crate buspirate_i2c_eeprom;
use buspirate_i2c_eeprom::*;

use std::path::Path;
use std::process::exit;

use buspirate_i2c_eeprom::buspirate::{
	BusPirate,
	I2cConfig,
	MAX_TRANSFER_LEN,
	Peripherals,
	Speed,
};
use buspirate_i2c_eeprom::eeprom::{
	AddressWidth,
	DEFAULT_DEVICE_ADDRESS,
	EepromProfile,
};
use buspirate_i2c_eeprom::image::{
	Format,
	Pattern,
};
use buspirate_i2c_eeprom::serial::SerialPort;

const DEFAULT_SERIAL_DEVICE: &str = "/dev/ttyUSB0";
const FORMATS: [&str; 2] = ["binary", "hex"];

fn get_param<T>(matches: &clap::ArgMatches, name: &str) -> AResult<T>
where
	T: std::str::FromStr,
	failure::Error: From<<T as std::str::FromStr>::Err>,
{
	let param = match matches.value_of(name) {
		Some(p) => p,
		None => bail!("missing parameter {}", name),
	};
	param.parse::<T>().map_err(|e| {
		let e = failure::Error::from(e);
		let msg = format!("invalid paramater {}: {}", name, e);
		e.context(msg).into()
	})
}

fn get_int(matches: &clap::ArgMatches, name: &str) -> AResult<Option<usize>> {
	match matches.value_of(name) {
		Some(p) => parse_int(p).map(Some).map_err(|e| {
			let msg = format!("invalid paramater {}: {}", name, e);
			e.context(msg).into()
		}),
		None => Ok(None),
	}
}

fn bus_args(app: clap::App<'static, 'static>) -> clap::App<'static, 'static> {
	app
		.arg(clap::Arg::with_name("device")
			.short("d")
			.long("device")
			.takes_value(true)
			.default_value(DEFAULT_SERIAL_DEVICE)
			.help("serial port of the BusPirate"))
		.arg(clap::Arg::with_name("speed")
			.short("c")
			.long("speed")
			.takes_value(true)
			.default_value("400kHz")
			.possible_values(&Speed::NAMES)
			.help("I2C clock speed"))
		.arg(clap::Arg::with_name("pullups")
			.short("e")
			.long("pullups")
			.help("enable the BusPirate's internal pull-up resistors"))
}

fn eeprom_args(app: clap::App<'static, 'static>) -> clap::App<'static, 'static> {
	app
		.arg(clap::Arg::with_name("chip")
			.short("t")
			.long("chip")
			.takes_value(true)
			.conflicts_with_all(&["page_size", "pages", "address_width"])
			.help("EEPROM type (24c01 .. 24c1024)"))
		.arg(clap::Arg::with_name("page_size")
			.short("b")
			.long("page_size")
			.takes_value(true)
			.requires("pages")
			.help("bytes per page listed in the EEPROM datasheet"))
		.arg(clap::Arg::with_name("pages")
			.short("p")
			.long("pages")
			.takes_value(true)
			.requires("page_size")
			.help("number of memory pages listed in the EEPROM datasheet"))
		.arg(clap::Arg::with_name("address_width")
			.short("w")
			.long("address_width")
			.takes_value(true)
			.possible_values(&["8", "16"])
			.help("bits of the memory address sent after the device address [default: 16]"))
		.arg(clap::Arg::with_name("address")
			.short("a")
			.long("address")
			.takes_value(true)
			.default_value("0x50")
			.help("I2C address of the EEPROM (7-bit, not the read or write address)"))
}

fn chunk_arg(app: clap::App<'static, 'static>) -> clap::App<'static, 'static> {
	app.arg(clap::Arg::with_name("chunk_size")
		.long("chunk_size")
		.takes_value(true)
		.help("bytes per read transaction [default: page size]"))
}

fn profile(matches: &clap::ArgMatches) -> AResult<EepromProfile> {
	let device_address = match matches.value_of("address") {
		Some(a) => eeprom::parse_device_address(a)?,
		None => DEFAULT_DEVICE_ADDRESS,
	};

	let profile = if let Some(chip) = matches.value_of("chip") {
		EepromProfile::from_chip(chip, device_address)?
	} else {
		match (get_int(matches, "page_size")?, get_int(matches, "pages")?) {
			(Some(page_size), Some(pages)) => {
				let bits = get_int(matches, "address_width")?.unwrap_or(16);
				EepromProfile::from_pages(page_size, pages, AddressWidth::from_bits(bits)?, device_address)?
			},
			_ => bail!("EEPROM geometry missing: use --chip, or --page_size and --pages"),
		}
	};
	info!("EEPROM {}", profile);
	Ok(profile)
}

fn chunk_size(matches: &clap::ArgMatches, profile: &EepromProfile) -> AResult<usize> {
	let size = get_int(matches, "chunk_size")?.unwrap_or_else(|| profile.page_size().min(MAX_TRANSFER_LEN));
	ensure!(size > 0 && size <= MAX_TRANSFER_LEN,
		"chunk size must be between 1 and {} bytes, got {}", MAX_TRANSFER_LEN, size
	);
	Ok(size)
}

fn with_bus<F, R>(matches: &clap::ArgMatches, f: F) -> AResult<R>
where
	F: FnOnce(&mut BusPirate<SerialPort>) -> AResult<R>,
{
	let device = Path::new(matches.value_of("device").unwrap_or(DEFAULT_SERIAL_DEVICE));
	let config = I2cConfig {
		speed: get_param(matches, "speed")?,
		peripherals: Peripherals {
			power: true,
			pullups: matches.is_present("pullups"),
			..Peripherals::off()
		},
	};

	let mut bp = open_buspirate(device, &config)?;
	f(&mut bp)
}

fn discover(sub_m: &clap::ArgMatches) -> AResult<()> {
	let result = with_bus(sub_m, |bp| discovery::scan(bp))?;
	info!("Address scanning complete");

	if result.eeproms.is_empty() {
		warn!("No EEPROM addresses were found. Please check your wiring or enable/disable internal pullups.");
	} else {
		println!("I2C address  read  write");
		for address in result.eeproms {
			println!("        0x{:02x}  0x{:02x}  0x{:02x}", address, address << 1 | 1, address << 1);
		}
	}

	if !result.single.is_empty() {
		warn!("Devices with only a single address were found:");
		for address_byte in result.single {
			println!("0x{:02x}", address_byte);
		}
	}

	Ok(())
}

fn dump(sub_m: &clap::ArgMatches) -> AResult<()> {
	let profile = profile(sub_m)?;
	let chunk_size = chunk_size(sub_m, &profile)?;
	let output = Path::new(sub_m.value_of("output").unwrap_or("EEPROM_Dump.bin"));
	let format: Format = get_param(sub_m, "format")?;

	image::prepare_output(output, sub_m.is_present("force"))?;
	let data = with_bus(sub_m, |bp| eeprom::dump(bp, &profile, chunk_size))?;
	image::write_image(output, format, &data)
}

fn flash(sub_m: &clap::ArgMatches) -> AResult<()> {
	let profile = profile(sub_m)?;
	let chunk_size = chunk_size(sub_m, &profile)?;
	let input = Path::new(sub_m.value_of("INPUT").unwrap_or_default());
	let format: Format = get_param(sub_m, "format")?;
	let verify = !sub_m.is_present("no_verify");

	let data = image::read_image(input, format, profile.capacity())?;
	with_bus(sub_m, |bp| {
		eeprom::flash(bp, &profile, &mut &data[..])?;
		if verify {
			eeprom::verify(bp, &profile, &data, chunk_size)?;
			info!("Verified {} bytes", data.len());
		}
		Ok(())
	})?;
	info!("File flashed to EEPROM successfully");
	Ok(())
}

fn wipe(sub_m: &clap::ArgMatches) -> AResult<()> {
	let profile = profile(sub_m)?;
	let chunk_size = chunk_size(sub_m, &profile)?;
	let pattern: Pattern = get_param(sub_m, "pattern")?;
	let verify = !sub_m.is_present("no_verify");

	with_bus(sub_m, |bp| {
		eeprom::wipe(bp, &profile, &pattern)?;
		if verify {
			eeprom::verify(bp, &profile, &pattern.fill(profile.capacity()), chunk_size)?;
			info!("Verified {} bytes", profile.capacity());
		}
		Ok(())
	})?;
	info!("EEPROM wiped successfully");
	Ok(())
}

fn blank(sub_m: &clap::ArgMatches) -> AResult<()> {
	let profile = profile(sub_m)?;
	let pattern: Pattern = get_param(sub_m, "pattern")?;
	let output = Path::new(sub_m.value_of("output").unwrap_or("Blank_Dump.bin"));
	let format: Format = get_param(sub_m, "format")?;

	image::create_blank(output, format, &pattern, profile.capacity(), sub_m.is_present("force"))
}

fn app() -> clap::App<'static, 'static> {
	let discover = bus_args(clap_app!(discover =>
		(about: "list addresses of attached I2C devices")
	));
	let dump = chunk_arg(eeprom_args(bus_args(clap_app!(dump =>
		(about: "read the EEPROM into a dump file")
		(@arg output: -o --output +takes_value default_value("EEPROM_Dump.bin") "dump file to create")
		(@arg format: --format +takes_value default_value("binary") possible_values(&FORMATS) "dump file format")
		(@arg force: -f --force "overwrite an existing file and create missing directories")
	))));
	let flash = chunk_arg(eeprom_args(bus_args(clap_app!(flash =>
		(about: "write a dump file to the EEPROM")
		(@arg format: --format +takes_value default_value("binary") possible_values(&FORMATS) "dump file format")
		(@arg no_verify: --no_verify "don't read the EEPROM back after writing")
		(@arg INPUT: +required "dump file to write; must match the EEPROM size")
	))));
	let wipe = chunk_arg(eeprom_args(bus_args(clap_app!(wipe =>
		(about: "fill the whole EEPROM with a pattern")
		(@arg pattern: -s --pattern +takes_value default_value("00") "hex bytes repeated over the EEPROM")
		(@arg no_verify: --no_verify "don't read the EEPROM back after writing")
	))));
	let blank = eeprom_args(clap_app!(blank =>
		(about: "create a dump file filled with a pattern (no BusPirate needed)")
		(@arg pattern: -s --pattern +takes_value default_value("DEADBEEF") "hex bytes repeated over the dump")
		(@arg output: -o --output +takes_value default_value("Blank_Dump.bin") "dump file to create")
		(@arg format: --format +takes_value default_value("binary") possible_values(&FORMATS) "dump file format")
		(@arg force: -f --force "overwrite an existing file and create missing directories")
	));

	clap_app!(@app (app_from_crate!())
		(@setting SubcommandRequiredElseHelp)
		(global_setting: clap::AppSettings::VersionlessSubcommands)
		(@arg verbose: -v --verbose "log every bus transaction")
		(subcommand: discover)
		(subcommand: dump)
		(subcommand: flash)
		(subcommand: wipe)
		(subcommand: blank)
	)
}

fn main_app(matches: &clap::ArgMatches) -> AResult<()> {
	match matches.subcommand() {
		("discover", Some(sub_m)) => {
			discover(sub_m)
		}
		("dump", Some(sub_m)) => {
			dump(sub_m)
		}
		("flash", Some(sub_m)) => {
			flash(sub_m)
		}
		("wipe", Some(sub_m)) => {
			wipe(sub_m)
		}
		("blank", Some(sub_m)) => {
			blank(sub_m)
		}
		("", _) => bail!("no subcommand"),
		(cmd, _) => bail!("not implemented subcommand {:?}", cmd),
	}
}

fn main() {
	let matches = app().get_matches();

	let default_filter = if matches.is_present("verbose") { "debug" } else { "info" };
	env_logger::from_env(env_logger::Env::default().default_filter_or(default_filter)).init();

	if let Err(e) = main_app(&matches) {
		error!("Error: {}", e);
		exit(1);
	}
}

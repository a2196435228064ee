#![no_main]
#![no_std]

use panic_probe as _;
use defmt_rtt as _;
use defmt::{error, info, warn};

use boot::handoff;
use boot::{
    device_transport_init, enter_xip, DeviceIndex, Flash, OctoTransport, Platform, SpiTransport, Transport,
    Transports,
};
use hal::gpio::{Output, PushPull, PB12};
use hal::pac;
use hal::prelude::*;
use fugit::RateExtU32;
use spiflash::Spi;

use stm32h7xx_hal as hal;

mod config;
mod cpu;
mod irq;
mod octospi;
mod spi;

use cpu::CortexM;
use irq::GlobalIrq;
use octospi::Ospi1;
use spi::Spi2Bus;

/// The hardware on this board.
pub struct Board;

impl Platform for Board {
    type Octo = Ospi1;
    type Spi = Spi2Bus;
    type Pin = PB12<Output<PushPull>>;
    type Irq = GlobalIrq;

    fn retry_delay() {
        cortex_m::asm::delay(config::SYS_CLOCK_MHZ * 100);
    }
}

const JEDEC_ID: u8 = 0x9f;

#[cortex_m_rt::entry]
fn main() -> ! {
    let cp = cortex_m::Peripherals::take().unwrap();
    let dp = pac::Peripherals::take().unwrap();

    // - power & clocks -------------------------------------------------------

    let pwr = dp.PWR.constrain();
    let pwrcfg = pwr.smps().freeze();
    let ccdr = dp
        .RCC
        .constrain()
        .sys_ck(config::SYS_CLOCK_MHZ.MHz())
        .freeze(pwrcfg, &dp.SYSCFG);

    // - pins -----------------------------------------------------------------

    let gpiob = dp.GPIOB.split(ccdr.peripheral.GPIOB);
    let gpioc = dp.GPIOC.split(ccdr.peripheral.GPIOC);
    let gpiod = dp.GPIOD.split(ccdr.peripheral.GPIOD);
    let gpioe = dp.GPIOE.split(ccdr.peripheral.GPIOE);
    let gpiog = dp.GPIOG.split(ccdr.peripheral.GPIOG);

    let mut led_user = gpioc.pc3.into_push_pull_output();
    led_user.set_low();

    // OCTOSPI1, quad wiring, hardware chip select.
    let _clk = gpiob.pb2.into_alternate::<9>().speed(hal::gpio::Speed::VeryHigh);
    let _ncs = gpiog.pg6.into_alternate::<10>().speed(hal::gpio::Speed::VeryHigh);
    let _io0 = gpiod.pd11.into_alternate::<9>().speed(hal::gpio::Speed::VeryHigh);
    let _io1 = gpiod.pd12.into_alternate::<9>().speed(hal::gpio::Speed::VeryHigh);
    let _io2 = gpioe.pe2.into_alternate::<9>().speed(hal::gpio::Speed::VeryHigh);
    let _io3 = gpiod.pd13.into_alternate::<9>().speed(hal::gpio::Speed::VeryHigh);

    // SPI2 with a discrete chip select.
    let sck = gpiob.pb13.into_alternate::<5>();
    let miso = gpiob.pb14.into_alternate::<5>();
    let mosi = gpiob.pb15.into_alternate::<5>();
    let mut ext_cs = gpiob.pb12.into_push_pull_output();
    ext_cs.set_high();

    warn!("Running");

    // - transports -----------------------------------------------------------

    let octospi = dp.OCTOSPI1.octospi_unchecked(
        config::OSPI_CLOCK_MHZ.MHz(),
        &ccdr.clocks,
        ccdr.peripheral.OCTOSPI1,
    );
    let (ospi, _) = octospi.free();
    // SAFETY: OCTOSPI1 maps the whole device at OSPI_BASE.
    let main = unsafe {
        OctoTransport::<Board>::new(Ospi1::new(ospi), config::OSPI_BASE, config::MAIN_FLASH_SIZE, None)
    };

    let spi2 = dp.SPI2.spi(
        (sck, miso, mosi),
        hal::spi::MODE_0,
        config::SPI_CLOCK_MHZ.MHz(),
        ccdr.peripheral.SPI2,
        &ccdr.clocks,
    );
    let ext = SpiTransport::<Board, { config::EXT_SCRATCH_SIZE }>::new(Spi2Bus::new(spi2), ext_cs);

    let mut transports = Transports::new(Some(main), Some(ext));
    let mut main_flash = Flash::new(DeviceIndex::Main, "main");
    let mut ext_flash = Flash::new(DeviceIndex::Ext, "ext");
    device_transport_init(&mut main_flash, &mut transports).unwrap();
    device_transport_init(&mut ext_flash, &mut transports).unwrap();

    probe(&mut main_flash);
    probe(&mut ext_flash);

    // - boot -----------------------------------------------------------------

    main_flash.read_cmd_format = Some(config::MAIN_FAST_READ);
    let mut cpu = CortexM::new(cp);
    match enter_xip(&mut main_flash) {
        Ok(mut xip) => match unsafe { handoff::chain(&mut xip, &mut cpu) } {
            Ok(never) => match never {},
            Err(e) => error!("boot: unable to read the image header: {}", e),
        },
        Err(e) => error!("xip: unable to map the main flash: {}", e),
    }

    // - heartbeat ------------------------------------------------------------

    loop {
        led_user.toggle();
        cortex_m::asm::delay(config::HEARTBEAT_CYCLES);
    }
}

/// Log the JEDEC id of a registered flash.
fn probe(flash: &mut Flash<Transport<Board, { config::EXT_SCRATCH_SIZE }>>) {
    let mut id = [0u8; 3];
    match flash.locked(|spi| spi.write_read(&[JEDEC_ID], &mut id)) {
        Ok(()) => info!("{}: JEDEC id {:02x}", flash.name, id),
        Err(e) => warn!("{}: no answer to JEDEC id: {}", flash.name, e),
    }
}

// Scripts injected through WebDriver `execute/sync`. Arguments arrive as `arguments[n]`.

/// Tags every fillable control with `data-applybot-id` and reports it as a `FormControl`.
/// Radio/checkbox groups share one id; each option input carries
/// `data-applybot-option = "<group id>:<index>"`.
pub const FORM_SNAPSHOT: &str = r#"
const ID = 'data-applybot-id';
const OPT = 'data-applybot-option';
window.__applybotSeq = window.__applybotSeq || 0;
const tag = (el) => {
  if (!el.getAttribute(ID)) { el.setAttribute(ID, 'applybot-' + (window.__applybotSeq++)); }
  return el.getAttribute(ID);
};
const clean = (s) => (s || '').replace(/\s+/g, ' ').trim();
const hintsOf = (el) => ['name', 'id', 'placeholder', 'aria-label']
  .map(a => el.getAttribute(a) || '').join(' ').toLowerCase().trim();
const labelFor = (el) => {
  if (el.id) {
    const l = document.querySelector('label[for="' + CSS.escape(el.id) + '"]');
    if (l && clean(l.innerText)) return clean(l.innerText);
  }
  const wrap = el.closest('label');
  if (wrap && clean(wrap.innerText)) return clean(wrap.innerText);
  const aria = el.getAttribute('aria-label');
  if (aria) return clean(aria);
  const sib = el.nextElementSibling;
  return sib ? clean(sib.innerText) : '';
};
const preceding = (el, exclude) => {
  let best = '';
  for (const n of document.querySelectorAll('label, legend, h3, h4, strong')) {
    if (exclude.has(n)) continue;
    if (n.compareDocumentPosition(el) & Node.DOCUMENT_POSITION_FOLLOWING) {
      const t = clean(n.innerText);
      if (t) best = t;
    }
  }
  return best;
};
const questionFor = (el, exclude) => {
  const fs = el.closest('fieldset');
  if (fs) {
    const lg = fs.querySelector('legend');
    if (lg && clean(lg.innerText)) return clean(lg.innerText);
  }
  const group = el.closest('[role="radiogroup"], [role="group"]');
  if (group) {
    const by = group.getAttribute('aria-labelledby');
    if (by) {
      const t = clean(by.split(/\s+/).map(i => { const n = document.getElementById(i); return n ? n.innerText : ''; }).join(' '));
      if (t) return t;
    }
  }
  if (!exclude) return labelFor(el) || preceding(el, new Set());
  return preceding(el, exclude);
};
const out = [];
for (const el of document.querySelectorAll('textarea, input[type="text"], input[type="number"], input[type="tel"], input:not([type])')) {
  if (el.disabled || el.readOnly) continue;
  out.push({
    id: tag(el),
    kind: el.tagName === 'TEXTAREA' ? 'text_area' : 'text_input',
    question: questionFor(el, null),
    hints: hintsOf(el),
    options: [],
    value: el.value || null,
    selected: [],
    required: el.required || el.getAttribute('aria-required') === 'true',
  });
}
for (const kind of ['radio', 'checkbox']) {
  const groups = new Map();
  for (const el of document.querySelectorAll('input[type="' + kind + '"]')) {
    if (el.disabled) continue;
    const key = el.name || ('solo-' + tag(el));
    if (!groups.has(key)) groups.set(key, []);
    groups.get(key).push(el);
  }
  for (const inputs of groups.values()) {
    const id = tag(inputs[0]);
    const labels = new Set();
    const options = inputs.map((el, i) => {
      el.setAttribute(OPT, id + ':' + i);
      if (el.id) { const l = document.querySelector('label[for="' + CSS.escape(el.id) + '"]'); if (l) labels.add(l); }
      const w = el.closest('label'); if (w) labels.add(w);
      return labelFor(el);
    });
    out.push({
      id: id,
      kind: kind,
      question: questionFor(inputs[0], labels),
      hints: hintsOf(inputs[0]),
      options: options,
      value: null,
      selected: inputs.map((el, i) => el.checked ? i : -1).filter(i => i >= 0),
      required: inputs.some(el => el.required || el.getAttribute('aria-required') === 'true'),
    });
  }
}
for (const el of document.querySelectorAll('select')) {
  if (el.disabled) continue;
  out.push({
    id: tag(el),
    kind: 'select',
    question: questionFor(el, null),
    hints: hintsOf(el),
    options: Array.from(el.options).map(o => clean(o.text)),
    value: null,
    selected: el.selectedIndex >= 0 ? [el.selectedIndex] : [],
    required: el.required || el.getAttribute('aria-required') === 'true',
  });
}
return out;
"#;

/// Replaces a text control's value through the native setter so framework-controlled
/// inputs see the change. arguments: [control id, text].
pub const FILL_TEXT: &str = r#"
const el = document.querySelector('[data-applybot-id="' + arguments[0] + '"]');
if (!el) throw new Error('control not found: ' + arguments[0]);
el.scrollIntoView({block: 'center'});
el.focus();
const proto = el.tagName === 'TEXTAREA' ? HTMLTextAreaElement.prototype : HTMLInputElement.prototype;
const setter = Object.getOwnPropertyDescriptor(proto, 'value').set;
setter.call(el, '');
el.dispatchEvent(new Event('input', {bubbles: true}));
setter.call(el, arguments[1]);
el.dispatchEvent(new Event('input', {bubbles: true}));
el.dispatchEvent(new Event('change', {bubbles: true}));
el.dispatchEvent(new Event('blur', {bubbles: true}));
return true;
"#;

/// arguments: [control id, option index].
pub const CHOOSE_OPTION: &str = r#"
const id = arguments[0];
const idx = arguments[1];
const sel = document.querySelector('select[data-applybot-id="' + id + '"]');
if (sel) {
  sel.scrollIntoView({block: 'center'});
  sel.selectedIndex = idx;
  sel.dispatchEvent(new Event('input', {bubbles: true}));
  sel.dispatchEvent(new Event('change', {bubbles: true}));
  return true;
}
const opt = document.querySelector('[data-applybot-option="' + id + ':' + idx + '"]');
if (!opt) throw new Error('option not found: ' + id + ':' + idx);
opt.scrollIntoView({block: 'center'});
if (opt.type === 'checkbox' && opt.checked) return true;
opt.click();
return true;
"#;

/// arguments: [element]. Script click avoids overlay interception.
pub const CLICK: &str = r#"
arguments[0].scrollIntoView({block: 'center'});
arguments[0].click();
return true;
"#;

/// arguments: [dy].
pub const SCROLL_BY: &str = "window.scrollBy(0, arguments[0]); return true;";

/// Writes a solved challenge token into every known response field and fires any
/// registered callbacks. arguments: [token]. Returns the number of callbacks invoked.
pub const INJECT_CHALLENGE_TOKEN: &str = r#"
const token = arguments[0];
document.querySelectorAll('#g-recaptcha-response, [name="g-recaptcha-response"], textarea.g-recaptcha-response, [name="cf-turnstile-response"], input[name*="turnstile"]')
  .forEach(el => { el.style.display = 'block'; el.innerHTML = token; el.value = token; });
let called = 0;
const visit = (node, depth) => {
  if (!node || typeof node !== 'object' || depth > 4) return;
  if (typeof node.callback === 'function') { try { node.callback(token); called++; } catch (e) {} return; }
  Object.values(node).forEach(v => visit(v, depth + 1));
};
try { if (typeof ___grecaptcha_cfg !== 'undefined') visit(___grecaptcha_cfg.clients, 0); } catch (e) {}
for (const name of ['captchaCallback', 'onRecaptchaSuccess', 'onTurnstileSuccess']) {
  if (typeof window[name] === 'function') { try { window[name](token); called++; } catch (e) {} }
}
return called;
"#;

/// Hides `navigator.webdriver` for the current document.
pub const MASK_AUTOMATION: &str = r#"
try { Object.defineProperty(navigator, 'webdriver', {get: () => undefined}); } catch (e) {}
return true;
"#;
